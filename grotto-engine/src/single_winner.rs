use crate::pool::Call;
use crate::pot::{CreatePot, PotEngine};
use crate::settlement::Settlement;
use crate::Result;
use grotto_core::{Address, Amount, EngineConfig, Ledger, PoolStatus, PotKind, WagerKind};
use std::sync::Arc;

/// Pot that ends on its first correct guess.
///
/// A matching play closes and settles the pot in the same call, whatever the
/// `auto_settle` setting. Count or time closure without a match routes the
/// whole pool to the creator.
pub struct SingleWinnerPotEngine {
    pots: PotEngine,
}

impl SingleWinnerPotEngine {
    pub fn new(address: Address, config: Arc<EngineConfig>) -> Self {
        Self {
            pots: PotEngine::new(address, PotKind::SingleWinner, config),
        }
    }

    pub fn address(&self) -> &Address {
        self.pots.address()
    }

    pub fn kind(&self) -> WagerKind {
        WagerKind::SingleWinnerPot
    }

    pub fn create(&self, ledger: &mut Ledger, call: &Call<'_>, request: CreatePot) -> Result<u64> {
        self.pots.create(ledger, call, request)
    }

    pub fn play(
        &self,
        ledger: &mut Ledger,
        call: &Call<'_>,
        id: u64,
        guess: Vec<u32>,
        value: Amount,
    ) -> Result<PoolStatus> {
        let mut staged = self.pots.stage_play(ledger, call, id, guess, value)?;

        if staged.matched {
            tracing::info!("{} guessed single-winner pot {}", call.sender, id);
            self.pots.close_staged(&mut staged, true, call.now);
        } else if staged.pot.pool.participant_cap_reached() {
            let settle = self.pots.auto_settle();
            self.pots.close_staged(&mut staged, settle, call.now);
        }

        self.pots.commit_play(ledger, call, staged)
    }

    pub fn end(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.pots.end(ledger, call, id)
    }

    pub fn force_end(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.pots.force_end(ledger, call, id)
    }

    pub fn find_winner(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.pots.find_winner(ledger, call, id)
    }

    pub fn claim(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.pots.claim(ledger, call, id)
    }

    pub fn claim_creator(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.pots.claim_creator(ledger, call, id)
    }

    pub fn claim_platform(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.pots.claim_platform(ledger, call, id)
    }
}
