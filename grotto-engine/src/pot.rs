use crate::lotto::{commit_payout, settlement_of};
use crate::pool::{self, Call, PoolParams};
use crate::settlement::{self, Settlement};
use crate::{Result, WagerError};
use grotto_core::{
    Address, Amount, Commit, EngineConfig, Event, Guess, GuessComparison, Ledger, PoolStatus,
    Pot, PotKind, Role, Scope, StatsDelta, Transfer, Wager, WagerKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Parameters for a guessing pot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePot {
    pub params: PoolParams,
    pub winning_numbers: Vec<u32>,
    pub comparison: GuessComparison,
}

/// A play staged on a copy of the pot, not yet committed.
pub(crate) struct StagedPlay {
    pub pot: Pot,
    pub events: Vec<Event>,
    pub stats: Vec<StatsDelta>,
    pub value: Amount,
    /// Whether the submitted guess satisfies the pot's comparison.
    pub matched: bool,
}

/// Guessing pot engine. One instance serves one pot kind; the single-winner
/// engine drives an instance of [`PotKind::SingleWinner`] with its own
/// closure rule.
pub struct PotEngine {
    address: Address,
    pot_kind: PotKind,
    config: Arc<EngineConfig>,
}

impl PotEngine {
    pub fn new(address: Address, pot_kind: PotKind, config: Arc<EngineConfig>) -> Self {
        Self {
            address,
            pot_kind,
            config,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn kind(&self) -> WagerKind {
        match self.pot_kind {
            PotKind::MultiWinner => WagerKind::Pot,
            PotKind::SingleWinner => WagerKind::SingleWinnerPot,
        }
    }

    pub(crate) fn auto_settle(&self) -> bool {
        self.config.auto_settle
    }

    fn scope(&self) -> Scope {
        Scope::for_kind(self.kind())
    }

    fn authorize(&self, call: &Call<'_>, role: Role) -> Result<()> {
        pool::authorize(&self.address, self.scope(), call, role)
    }

    fn load(&self, ledger: &Ledger, id: u64) -> Result<Pot> {
        match pool::load(ledger, id, self.kind())? {
            Wager::Pot(pot) => Ok(pot),
            Wager::Lotto(_) => Err(WagerError::WrongKind {
                id,
                expected: self.kind(),
                actual: WagerKind::Lotto,
            }),
        }
    }

    pub fn create(&self, ledger: &mut Ledger, call: &Call<'_>, request: CreatePot) -> Result<u64> {
        self.authorize(call, Role::Creator)?;
        let CreatePot {
            params,
            winning_numbers,
            comparison,
        } = request;
        params.validate(call.now)?;

        if winning_numbers.is_empty() {
            return Err(WagerError::InvalidWinningNumbers(
                "Winning numbers can not be empty".to_string(),
            ));
        }
        if winning_numbers.len() > self.config.max_guess_len {
            return Err(WagerError::InvalidWinningNumbers(format!(
                "At most {} numbers allowed, got {}",
                self.config.max_guess_len,
                winning_numbers.len()
            )));
        }

        let id = pool::reserve_id(ledger, params.id)?;
        let pot = Pot {
            pool: pool::new_pool(id, call.sender, &params, call.now),
            pot_kind: self.pot_kind,
            winning_numbers,
            comparison,
            guesses: Vec::new(),
            winners: Vec::new(),
            winner_share: Amount::ZERO,
            claimed: BTreeSet::new(),
        };

        let kind = self.kind();
        ledger.commit(
            Commit::new(Wager::Pot(pot), call.now)
                .stats(StatsDelta::created(kind))
                .event(Event::PotCreated {
                    id,
                    creator: call.sender.clone(),
                    kind,
                }),
        )?;

        tracing::info!(
            "{} {} created by {} (bet {}, {:?}, {:?})",
            kind,
            id,
            call.sender,
            params.bet_amount,
            params.winning_kind,
            comparison
        );
        Ok(id)
    }

    /// Returns the pool status after the play.
    pub fn play(
        &self,
        ledger: &mut Ledger,
        call: &Call<'_>,
        id: u64,
        guess: Vec<u32>,
        value: Amount,
    ) -> Result<PoolStatus> {
        let mut staged = self.stage_play(ledger, call, id, guess, value)?;

        if staged.pot.pool.participant_cap_reached() {
            let settle = self.auto_settle();
            self.close_staged(&mut staged, settle, call.now);
        }

        self.commit_play(ledger, call, staged)
    }

    /// Runs every admission check and records the play on a copy of the pot.
    pub(crate) fn stage_play(
        &self,
        ledger: &Ledger,
        call: &Call<'_>,
        id: u64,
        guess: Vec<u32>,
        value: Amount,
    ) -> Result<StagedPlay> {
        self.authorize(call, Role::Player)?;
        let mut pot = self.load(ledger, id)?;
        pool::check_play(&pot.pool, call.sender, value, call.now)?;

        if guess.len() != pot.winning_numbers.len() {
            return Err(WagerError::InvalidGuess {
                expected: pot.winning_numbers.len(),
                got: guess.len(),
            });
        }

        let matched = pot.comparison.matches(&pot.winning_numbers, &guess);
        let event = pool::record_play(&mut pot.pool, call.sender, value)?;
        pot.guesses.push(Guess {
            player: call.sender.clone(),
            numbers: guess,
        });

        Ok(StagedPlay {
            pot,
            events: vec![event],
            stats: vec![StatsDelta::played(value)],
            value,
            matched,
        })
    }

    pub(crate) fn close_staged(&self, staged: &mut StagedPlay, settle: bool, now: i64) {
        staged.events.push(pool::close(&mut staged.pot.pool, now));
        if settle {
            let (event, delta) = self.settle(&mut staged.pot, now);
            staged.events.push(event);
            staged.stats.push(delta);
        }
    }

    pub(crate) fn commit_play(
        &self,
        ledger: &mut Ledger,
        call: &Call<'_>,
        staged: StagedPlay,
    ) -> Result<PoolStatus> {
        let StagedPlay {
            pot,
            events,
            stats,
            value,
            ..
        } = staged;

        let status = pot.pool.status;
        ledger.commit(
            Commit::new(Wager::Pot(pot), call.now)
                .deltas(stats)
                .transfer(Transfer::Stake {
                    from: call.sender.clone(),
                    amount: value,
                })
                .events(events),
        )?;
        Ok(status)
    }

    pub fn end(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.authorize(call, Role::Admin)?;
        let mut pot = self.load(ledger, id)?;
        pool::check_end(&pot.pool, call.now)?;

        let closed = pool::close(&mut pot.pool, call.now);
        self.finish(ledger, pot, vec![closed], call.now)
    }

    pub fn force_end(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.authorize(call, Role::Admin)?;
        call.require_sender(self.scope(), Role::Admin)?;
        let mut pot = self.load(ledger, id)?;
        if pot.pool.is_finished() {
            return Err(WagerError::AlreadyFinished(id));
        }

        tracing::warn!("{} {} force-ended by {}", self.kind(), id, call.sender);
        let closed = pool::close(&mut pot.pool, call.now);
        self.finish(ledger, pot, vec![closed], call.now)
    }

    /// Idempotent: a settled pot returns its stored payout table.
    pub fn find_winner(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.authorize(call, Role::Admin)?;
        let mut pot = self.load(ledger, id)?;

        match pot.pool.status {
            PoolStatus::Settled => settlement_of(&Wager::Pot(pot)),
            PoolStatus::Closed => self.finish(ledger, pot, Vec::new(), call.now),
            PoolStatus::Open => {
                pool::check_end(&pot.pool, call.now)?;
                let closed = pool::close(&mut pot.pool, call.now);
                self.finish(ledger, pot, vec![closed], call.now)
            }
        }
    }

    pub fn claim(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.authorize(call, Role::Admin)?;
        let mut pot = self.load(ledger, id)?;

        if !pot.pool.is_settled() {
            return Err(WagerError::NotFinished(id));
        }
        if !pot.is_winner(call.sender) {
            return Err(WagerError::NotAWinner(call.sender.clone()));
        }
        if !pot.claimed.insert(call.sender.clone()) {
            return Err(WagerError::AlreadyClaimed(id));
        }

        let amount = pot.winner_share;
        commit_payout(
            ledger,
            Wager::Pot(pot),
            call.sender,
            amount,
            Event::Claimed {
                id,
                winner: call.sender.clone(),
                amount,
            },
            call.now,
        )?;

        tracing::info!("{} claimed {} from {} {}", call.sender, amount, self.kind(), id);
        Ok(amount)
    }

    pub fn claim_creator(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.authorize(call, Role::Admin)?;
        let mut pot = self.load(ledger, id)?;
        check_winner_claimed_first(&pot)?;
        let amount = pool::take_creator_share(&mut pot.pool, call.sender)?;

        commit_payout(
            ledger,
            Wager::Pot(pot),
            call.sender,
            amount,
            Event::CreatorClaimed {
                id,
                creator: call.sender.clone(),
                amount,
            },
            call.now,
        )?;

        tracing::info!(
            "Creator {} claimed {} from {} {}",
            call.sender,
            amount,
            self.kind(),
            id
        );
        Ok(amount)
    }

    pub fn claim_platform(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.authorize(call, Role::Admin)?;
        call.require_sender(self.scope(), Role::Admin)?;
        let mut pot = self.load(ledger, id)?;
        check_winner_claimed_first(&pot)?;
        let amount = pool::take_platform_share(&mut pot.pool)?;

        let platform = &self.config.platform_account;
        commit_payout(
            ledger,
            Wager::Pot(pot),
            platform,
            amount,
            Event::PlatformClaimed {
                id,
                platform: platform.clone(),
                amount,
            },
            call.now,
        )?;

        tracing::info!("Platform claimed {} from {} {}", amount, self.kind(), id);
        Ok(amount)
    }

    fn finish(
        &self,
        ledger: &mut Ledger,
        mut pot: Pot,
        mut events: Vec<Event>,
        now: i64,
    ) -> Result<Settlement> {
        let (settled, stats) = self.settle(&mut pot, now);
        events.push(settled);

        let wager = Wager::Pot(pot);
        let settlement = settlement_of(&wager)?;
        ledger.commit(Commit::new(wager, now).stats(stats).events(events))?;
        Ok(settlement)
    }

    /// Collects matching guesses in play order and fixes every share.
    fn settle(&self, pot: &mut Pot, now: i64) -> (Event, StatsDelta) {
        let limit = match self.pot_kind {
            PotKind::MultiWinner => usize::MAX,
            PotKind::SingleWinner => 1,
        };
        let winners: Vec<Address> = pot
            .guesses
            .iter()
            .filter(|g| pot.comparison.matches(&pot.winning_numbers, &g.numbers))
            .map(|g| g.player.clone())
            .take(limit)
            .collect();

        let split = self.config.split_policy.for_kind(self.kind());
        let distribution = settlement::distribute(pot.pool.stakes, split, winners.len());
        settlement::apply(
            &mut pot.pool,
            &distribution,
            self.config.split_policy.version,
            now,
        );
        pot.winner_share = distribution.per_winner;
        pot.winners = winners.clone();

        tracing::info!(
            "{} {} settled: {} winner(s) at {} each, {} to creator, {} to platform",
            self.kind(),
            pot.pool.id,
            winners.len(),
            distribution.per_winner,
            distribution.creator,
            distribution.platform
        );

        (
            Event::PoolSettled {
                id: pot.pool.id,
                winners,
            },
            StatsDelta::settled(
                distribution.creator,
                distribution.platform,
                distribution.winners_total(),
            ),
        )
    }
}

/// Creator and platform wait until at least one winner has claimed.
fn check_winner_claimed_first(pot: &Pot) -> Result<()> {
    if pot.pool.is_settled() && !pot.winners.is_empty() && pot.claimed.is_empty() {
        return Err(WagerError::CreatorCannotClaimYet(pot.pool.id));
    }
    Ok(())
}
