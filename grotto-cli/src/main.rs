mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use grotto_engine::WagerError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grotto")]
#[command(about = "Grotto - lotto and pot wagering engine")]
#[command(version)]
struct Cli {
    /// Data directory for the ledger database
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Address acting for this command (defaults to the configured operator)
    #[arg(short = 'a', long = "as", global = true)]
    sender: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grant the deployment roles and commit to a draw seed
    Init,

    /// Lotto commands
    #[command(subcommand)]
    Lotto(commands::LottoCommands),

    /// Pot commands
    #[command(subcommand)]
    Pot(commands::PotCommands),

    /// Close and settle a wager whose closure condition holds
    End { id: u64 },
    /// Close and settle a wager now (admin)
    ForceEnd { id: u64 },
    /// Settle a closed wager, or show its settlement
    FindWinner { id: u64 },
    /// Claim a winner share
    Claim { id: u64 },
    /// Claim the creator share
    ClaimCreator { id: u64 },
    /// Claim the platform share (admin)
    ClaimPlatform { id: u64 },
    /// Withdraw everything claimed so far
    Withdraw,

    /// Show one wager
    Show { id: u64 },
    /// List wagers
    List(commands::ListArgs),
    /// Show platform statistics
    Stats,
    /// Show the withdrawable balance of an address
    Balance { address: Option<String> },

    /// Grant a role on a scope (admin of that scope)
    Grant {
        /// creator, player or admin
        role: String,
        /// lotto, pot, single_winner_pot or ledger
        scope: String,
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "grotto={},grotto_core={},grotto_engine={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = CliConfig::default();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    tokio::fs::create_dir_all(&config.data_dir).await?;
    let config = config.load_overrides()?;

    let session = commands::Session::open(&config).await?;
    let sender = cli
        .sender
        .map(grotto_core::Address::from)
        .unwrap_or_else(|| config.operator.clone());

    let result = match cli.command {
        Commands::Init => commands::init(&session, &config),
        Commands::Lotto(cmd) => commands::handle_lotto_command(cmd, &session, &sender),
        Commands::Pot(cmd) => commands::handle_pot_command(cmd, &session, &sender),
        Commands::End { id } => commands::end(&session, &sender, id),
        Commands::ForceEnd { id } => commands::force_end(&session, &sender, id),
        Commands::FindWinner { id } => commands::find_winner(&session, &sender, id),
        Commands::Claim { id } => commands::claim(&session, &sender, id),
        Commands::ClaimCreator { id } => commands::claim_creator(&session, &sender, id),
        Commands::ClaimPlatform { id } => commands::claim_platform(&session, &sender, id),
        Commands::Withdraw => commands::withdraw(&session, &sender),
        Commands::Show { id } => commands::show(&session, id),
        Commands::List(args) => commands::list(&session, args),
        Commands::Stats => commands::stats(&session),
        Commands::Balance { address } => {
            let address = address.map(grotto_core::Address::from).unwrap_or(sender);
            commands::balance(&session, &address)
        }
        Commands::Grant {
            role,
            scope,
            address,
        } => commands::grant(&session, &sender, &role, &scope, &address),
    };

    match result {
        Ok(()) => session.save().await?,
        Err(e) => {
            match e.downcast_ref::<WagerError>() {
                Some(WagerError::Unauthorized { scope, role, .. }) => {
                    eprintln!("Error: {}", e);
                    eprintln!(
                        "An admin can run 'grotto grant {} {} <address>'",
                        role, scope
                    );
                }
                Some(WagerError::NotFound(id)) => {
                    eprintln!("Error: Wager {} not found", id);
                    eprintln!("Use 'grotto list' to see existing wagers");
                }
                _ => eprintln!("Error: {}", e),
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
