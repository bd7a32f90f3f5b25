use crate::config::CliConfig;
use grotto_core::{LedgerStore, Storage, SystemClock};
use grotto_engine::{CommittedSeed, Grotto, RandomnessProvider};
use std::sync::Arc;

const META_SEED: &str = "draw_seed";

/// One CLI invocation: the persisted ledger loaded into a facade.
pub struct Session {
    storage: Storage,
    grotto: Grotto,
}

impl Session {
    pub async fn open(config: &CliConfig) -> anyhow::Result<Self> {
        let storage = Storage::new(&config.db_path()).await?;
        let store = LedgerStore::new(&storage);

        let ledger = store.load_ledger().await?;
        let roles = store.load_roles().await?;

        // The seed is generated once per database and reused for every draw
        let seed = match store.get_meta(META_SEED).await? {
            Some(seed) => CommittedSeed::from_hex(&seed)?,
            None => {
                let seed = CommittedSeed::generate();
                store.set_meta(META_SEED, &seed.seed_hex()).await?;
                tracing::info!("Generated draw seed, commitment {}", seed.commitment());
                seed
            }
        };

        let grotto = Grotto::with_state(
            config.engine.clone(),
            Arc::new(seed),
            Arc::new(SystemClock),
            ledger,
            roles,
        )?;
        tracing::debug!("Opened ledger at {}", config.db_path().display());

        Ok(Self { storage, grotto })
    }

    pub fn grotto(&self) -> &Grotto {
        &self.grotto
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        let ledger = self.grotto.ledger().read().clone();
        let roles = self.grotto.roles().read().clone();

        let store = LedgerStore::new(&self.storage);
        store.save_ledger(&ledger).await?;
        store.save_roles(&roles).await?;
        tracing::debug!("Saved {} wagers", ledger.len());
        Ok(())
    }
}

