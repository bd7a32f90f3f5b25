use grotto_core::{Address, Amount, EngineConfig, LedgerStore, Storage, SystemClock};
use grotto_engine::{CommittedSeed, Grotto, PoolParams, RandomnessProvider};
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let seed = CommittedSeed::generate();
    println!("Seed commitment: {}", seed.commitment());

    let grotto = Grotto::new(
        EngineConfig::default(),
        Arc::new(seed),
        Arc::new(SystemClock),
    )?;
    let operator = Address::from("operator");
    grotto.bootstrap(&operator);

    let creator = Address::from("creator");
    let id = grotto.create_lotto(&creator, PoolParams::count_based(3, Amount::from_units(1_000)))?;
    println!("Created lotto {}", id);

    for name in ["alice", "bob", "carol"] {
        let status = grotto.play_lotto(&Address::from(name), id, Amount::from_units(1_000))?;
        println!("{} played, lotto is {}", name, status.as_str());
    }

    let settlement = grotto.find_winner(&operator, id)?;
    let winner = &settlement.winners[0];
    println!("\nWinner: {} ({})", winner, settlement.per_winner);

    grotto.claim(winner, id)?;
    grotto.claim_creator(&creator, id)?;
    println!("Winner withdrew {}", grotto.withdraw(winner)?);
    println!("Creator withdrew {}", grotto.withdraw(&creator)?);

    // Persist the ledger
    let temp_dir = tempdir()?;
    let storage = Storage::new(&temp_dir.path().join("grotto.db")).await?;
    let store = LedgerStore::new(&storage);
    let ledger = grotto.ledger().read().clone();
    store.save_ledger(&ledger).await?;

    let restored = store.load_ledger().await?;
    println!("\nRestored {} wagers, {} events", restored.len(), restored.events().len());
    println!("Stats: {:?}", grotto.reader().get_stats());

    Ok(())
}
