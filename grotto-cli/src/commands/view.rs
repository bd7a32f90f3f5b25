use super::Session;
use anyhow::bail;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use grotto_core::{Address, PoolStatus, Wager, WagerKind};
use grotto_engine::Filter;

#[derive(Args)]
pub struct ListArgs {
    /// lotto, pot or single_winner_pot
    #[arg(long)]
    kind: Option<String>,
    /// open, closed or settled
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    creator: Option<String>,
    #[arg(long)]
    player: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = 20)]
    per_page: usize,
}

impl ListArgs {
    fn filter(&self) -> anyhow::Result<Filter> {
        let mut filter = Filter::default();
        if let Some(kind) = &self.kind {
            filter = filter.kind(kind.parse::<WagerKind>().map_err(anyhow::Error::msg)?);
        }
        if let Some(status) = &self.status {
            filter = filter.status(parse_status(status)?);
        }
        if let Some(creator) = &self.creator {
            filter = filter.creator(Address::from(creator.as_str()));
        }
        if let Some(player) = &self.player {
            filter = filter.player(Address::from(player.as_str()));
        }
        Ok(filter)
    }
}

fn parse_status(status: &str) -> anyhow::Result<PoolStatus> {
    Ok(match status {
        "open" => PoolStatus::Open,
        "closed" => PoolStatus::Closed,
        "settled" => PoolStatus::Settled,
        other => bail!("Unknown status '{}'", other),
    })
}

pub fn show(session: &Session, id: u64) -> anyhow::Result<()> {
    let reader = session.grotto().reader();
    let Some(wager) = reader.get_by_id(id) else {
        bail!(grotto_engine::WagerError::NotFound(id));
    };
    let pool = wager.pool();

    println!("{} {}", wager.kind(), id);
    println!("  Creator: {}", pool.creator);
    println!("  Status: {}", pool.status.as_str());
    println!("  Bet: {}", pool.bet_amount);
    println!("  Stakes: {}", pool.stakes);
    if pool.max_participants > 0 {
        println!("  Players: {}/{}", pool.players.len(), pool.max_participants);
    } else {
        println!("  Players: {}", pool.players.len());
        println!("  Window: {} .. {}", pool.start_time, pool.end_time);
    }

    match &wager {
        Wager::Lotto(lotto) => {
            if let Some(winner) = &lotto.winner {
                println!("  Winner: {} ({})", winner, lotto.winning_amount);
                println!("  Winner claimed: {}", lotto.claimed_by_winner);
            }
            if let Some(draw) = &lotto.draw {
                println!(
                    "  Draw: index {} of {}, seed commitment {}",
                    draw.index, draw.participants, draw.seed_commitment
                );
            }
        }
        Wager::Pot(pot) => {
            println!("  Comparison: {:?}", pot.comparison);
            if pool.is_finished() {
                println!("  Winning numbers: {:?}", pot.winning_numbers);
            }
            if !pot.guesses.is_empty() {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Player", "Guess", "Winner", "Claimed"]);
                for guess in &pot.guesses {
                    table.add_row(vec![
                        guess.player.to_string(),
                        format!("{:?}", guess.numbers),
                        pot.is_winner(&guess.player).to_string(),
                        pot.claimed.contains(&guess.player).to_string(),
                    ]);
                }
                println!("{}", table);
            }
        }
    }

    if pool.is_settled() {
        println!("  Creator share: {} (claimed: {})", pool.creator_shares, pool.claimed_by_creator);
        println!(
            "  Platform share: {} (claimed: {})",
            pool.platform_shares, pool.claimed_by_platform
        );
    }

    Ok(())
}

pub fn list(session: &Session, args: ListArgs) -> anyhow::Result<()> {
    let page = session
        .grotto()
        .reader()
        .get_paginated(&args.filter()?, args.page, args.per_page)?;

    if page.items.is_empty() {
        println!("No wagers found");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Kind", "Creator", "Status", "Players", "Stakes"]);
    for wager in &page.items {
        let pool = wager.pool();
        table.add_row(vec![
            pool.id.to_string(),
            wager.kind().to_string(),
            pool.creator.to_string(),
            pool.status.as_str().to_string(),
            pool.players.len().to_string(),
            pool.stakes.to_string(),
        ]);
    }

    println!("{}", table);
    println!(
        "Page {} of {} ({} wagers)",
        page.page,
        page.total_pages(),
        page.total
    );
    Ok(())
}

pub fn stats(session: &Session) -> anyhow::Result<()> {
    let reader = session.grotto().reader();
    let stats = reader.get_stats();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Games".to_string(), stats.total_games.to_string()]);
    table.add_row(vec!["Lottos".to_string(), stats.total_lotto.to_string()]);
    table.add_row(vec!["Pots".to_string(), stats.total_pot.to_string()]);
    table.add_row(vec![
        "Single-winner pots".to_string(),
        stats.total_single_winner_pot.to_string(),
    ]);
    table.add_row(vec!["Creators".to_string(), stats.total_creators.to_string()]);
    table.add_row(vec!["Plays".to_string(), stats.total_players.to_string()]);
    table.add_row(vec!["Played".to_string(), stats.total_played.to_string()]);
    table.add_row(vec![
        "Creator shares".to_string(),
        stats.total_creator_shares.to_string(),
    ]);
    table.add_row(vec![
        "Platform shares".to_string(),
        stats.total_platform_shares.to_string(),
    ]);
    table.add_row(vec![
        "Player shares".to_string(),
        stats.total_player_shares.to_string(),
    ]);
    table.add_row(vec!["In custody".to_string(), reader.custody().to_string()]);

    println!("{}", table);
    Ok(())
}

pub fn balance(session: &Session, address: &Address) -> anyhow::Result<()> {
    let reader = session.grotto().reader();
    println!("Balance for {}: {}", address, reader.balance_of(address));

    let winnings = reader.get_player_winnings(address);
    let creator = reader.get_creator_winnings(address);
    if winnings.is_empty() && creator.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Wager", "Kind", "Role", "Amount", "Claimed"]);
    for (role, rows) in [("winner", winnings), ("creator", creator)] {
        for w in rows {
            table.add_row(vec![
                w.id.to_string(),
                w.kind.to_string(),
                role.to_string(),
                w.amount.to_string(),
                w.claimed.to_string(),
            ]);
        }
    }
    println!("{}", table);
    Ok(())
}
