use crate::pool::{self, Call, PoolParams};
use crate::randomness::RandomnessProvider;
use crate::settlement::{self, Settlement};
use crate::{Result, WagerError};
use grotto_core::{
    Address, Amount, Commit, Draw, EngineConfig, Event, Ledger, Lotto, PoolStatus, Role, Scope,
    StatsDelta, Transfer, Wager, WagerKind,
};
use std::sync::Arc;

/// Counted lottery: players buy in at a fixed stake and one of them is drawn.
///
/// State machine: `Open -> Closed -> Settled`, after which the winner,
/// creator and platform claims are independent one-shot flags.
pub struct LottoEngine {
    address: Address,
    config: Arc<EngineConfig>,
    randomness: Arc<dyn RandomnessProvider>,
}

impl LottoEngine {
    pub fn new(
        address: Address,
        config: Arc<EngineConfig>,
        randomness: Arc<dyn RandomnessProvider>,
    ) -> Self {
        Self {
            address,
            config,
            randomness,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    fn authorize(&self, call: &Call<'_>, role: Role) -> Result<()> {
        pool::authorize(&self.address, Scope::Lotto, call, role)
    }

    fn load(&self, ledger: &Ledger, id: u64) -> Result<Lotto> {
        match pool::load(ledger, id, WagerKind::Lotto)? {
            Wager::Lotto(lotto) => Ok(lotto),
            Wager::Pot(pot) => Err(WagerError::WrongKind {
                id,
                expected: WagerKind::Lotto,
                actual: pot.kind(),
            }),
        }
    }

    pub fn create(&self, ledger: &mut Ledger, call: &Call<'_>, params: PoolParams) -> Result<u64> {
        self.authorize(call, Role::Creator)?;
        params.validate(call.now)?;

        let id = pool::reserve_id(ledger, params.id)?;
        let lotto = Lotto {
            pool: pool::new_pool(id, call.sender, &params, call.now),
            winner: None,
            winning_amount: Amount::ZERO,
            claimed_by_winner: false,
            draw: None,
        };

        ledger.commit(
            Commit::new(Wager::Lotto(lotto), call.now)
                .stats(StatsDelta::created(WagerKind::Lotto))
                .event(Event::LottoCreated {
                    id,
                    creator: call.sender.clone(),
                }),
        )?;

        tracing::info!(
            "Lotto {} created by {} (bet {}, {:?})",
            id,
            call.sender,
            params.bet_amount,
            params.winning_kind
        );
        Ok(id)
    }

    /// Returns the pool status after the play.
    pub fn play(
        &self,
        ledger: &mut Ledger,
        call: &Call<'_>,
        id: u64,
        value: Amount,
    ) -> Result<PoolStatus> {
        self.authorize(call, Role::Player)?;
        let mut lotto = self.load(ledger, id)?;
        pool::check_play(&lotto.pool, call.sender, value, call.now)?;

        let mut events = vec![pool::record_play(&mut lotto.pool, call.sender, value)?];
        let mut stats = vec![StatsDelta::played(value)];

        if lotto.pool.participant_cap_reached() {
            events.push(pool::close(&mut lotto.pool, call.now));
            if self.config.auto_settle {
                let (settled, delta) = self.settle(&mut lotto, call.now)?;
                events.push(settled);
                stats.push(delta);
            }
        }

        let status = lotto.pool.status;
        ledger.commit(
            Commit::new(Wager::Lotto(lotto), call.now)
                .deltas(stats)
                .transfer(Transfer::Stake {
                    from: call.sender.clone(),
                    amount: value,
                })
                .events(events),
        )?;

        Ok(status)
    }

    /// Closes and settles a lotto whose closure condition holds.
    pub fn end(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.authorize(call, Role::Admin)?;
        let mut lotto = self.load(ledger, id)?;
        pool::check_end(&lotto.pool, call.now)?;

        let closed = pool::close(&mut lotto.pool, call.now);
        self.finish(ledger, lotto, vec![closed], call.now)
    }

    /// Closes and settles regardless of time or player count.
    pub fn force_end(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.authorize(call, Role::Admin)?;
        call.require_sender(Scope::Lotto, Role::Admin)?;
        let mut lotto = self.load(ledger, id)?;
        if lotto.pool.is_finished() {
            return Err(WagerError::AlreadyFinished(id));
        }

        tracing::warn!("Lotto {} force-ended by {}", id, call.sender);
        let closed = pool::close(&mut lotto.pool, call.now);
        self.finish(ledger, lotto, vec![closed], call.now)
    }

    /// Settles the lotto if needed and returns its payout table. Once settled
    /// the stored result is returned as is; the draw never runs twice.
    pub fn find_winner(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Settlement> {
        self.authorize(call, Role::Admin)?;
        let mut lotto = self.load(ledger, id)?;

        match lotto.pool.status {
            PoolStatus::Settled => settlement_of(&Wager::Lotto(lotto)),
            PoolStatus::Closed => self.finish(ledger, lotto, Vec::new(), call.now),
            PoolStatus::Open => {
                pool::check_end(&lotto.pool, call.now)?;
                let closed = pool::close(&mut lotto.pool, call.now);
                self.finish(ledger, lotto, vec![closed], call.now)
            }
        }
    }

    pub fn claim(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.authorize(call, Role::Admin)?;
        let mut lotto = self.load(ledger, id)?;

        if !lotto.pool.is_settled() {
            return Err(WagerError::NotFinished(id));
        }
        if lotto.winner.as_ref() != Some(call.sender) {
            return Err(WagerError::NotAWinner(call.sender.clone()));
        }
        if lotto.claimed_by_winner {
            return Err(WagerError::AlreadyClaimed(id));
        }

        lotto.claimed_by_winner = true;
        let amount = lotto.winning_amount;
        commit_payout(
            ledger,
            Wager::Lotto(lotto),
            call.sender,
            amount,
            Event::Claimed {
                id,
                winner: call.sender.clone(),
                amount,
            },
            call.now,
        )?;

        tracing::info!("{} claimed {} from lotto {}", call.sender, amount, id);
        Ok(amount)
    }

    pub fn claim_creator(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.authorize(call, Role::Admin)?;
        let mut lotto = self.load(ledger, id)?;
        let amount = pool::take_creator_share(&mut lotto.pool, call.sender)?;

        commit_payout(
            ledger,
            Wager::Lotto(lotto),
            call.sender,
            amount,
            Event::CreatorClaimed {
                id,
                creator: call.sender.clone(),
                amount,
            },
            call.now,
        )?;

        tracing::info!("Creator {} claimed {} from lotto {}", call.sender, amount, id);
        Ok(amount)
    }

    pub fn claim_platform(&self, ledger: &mut Ledger, call: &Call<'_>, id: u64) -> Result<Amount> {
        self.authorize(call, Role::Admin)?;
        call.require_sender(Scope::Lotto, Role::Admin)?;
        let mut lotto = self.load(ledger, id)?;
        let amount = pool::take_platform_share(&mut lotto.pool)?;

        let platform = &self.config.platform_account;
        commit_payout(
            ledger,
            Wager::Lotto(lotto),
            platform,
            amount,
            Event::PlatformClaimed {
                id,
                platform: platform.clone(),
                amount,
            },
            call.now,
        )?;

        tracing::info!("Platform claimed {} from lotto {}", amount, id);
        Ok(amount)
    }

    fn finish(
        &self,
        ledger: &mut Ledger,
        mut lotto: Lotto,
        mut events: Vec<Event>,
        now: i64,
    ) -> Result<Settlement> {
        let (settled, stats) = self.settle(&mut lotto, now)?;
        events.push(settled);

        let wager = Wager::Lotto(lotto);
        let settlement = settlement_of(&wager)?;
        ledger.commit(Commit::new(wager, now).stats(stats).events(events))?;
        Ok(settlement)
    }

    /// Draws the winner of a closed lotto and fixes every share.
    fn settle(&self, lotto: &mut Lotto, now: i64) -> Result<(Event, StatsDelta)> {
        let pool = &lotto.pool;
        let winner = if pool.players.is_empty() {
            None
        } else {
            let index = self.randomness.select(pool.id, &pool.players)?;
            let winner = pool
                .players
                .get(index as usize)
                .cloned()
                .ok_or_else(|| WagerError::invalid(format!("Draw index {} out of range", index)))?;
            lotto.draw = Some(Draw {
                seed_commitment: self.randomness.commitment(),
                index,
                participants: pool.players.len() as u64,
            });
            Some(winner)
        };

        let split = self.config.split_policy.for_kind(WagerKind::Lotto);
        let distribution =
            settlement::distribute(lotto.pool.stakes, split, winner.iter().count());
        settlement::apply(
            &mut lotto.pool,
            &distribution,
            self.config.split_policy.version,
            now,
        );
        lotto.winning_amount = distribution.winners_total();
        lotto.winner = winner.clone();

        tracing::info!(
            "Lotto {} settled: winner {:?}, {} to winner, {} to creator, {} to platform",
            lotto.pool.id,
            winner.as_ref().map(Address::as_str),
            lotto.winning_amount,
            distribution.creator,
            distribution.platform
        );

        Ok((
            Event::PoolSettled {
                id: lotto.pool.id,
                winners: winner.into_iter().collect(),
            },
            StatsDelta::settled(
                distribution.creator,
                distribution.platform,
                distribution.winners_total(),
            ),
        ))
    }
}

pub(crate) fn settlement_of(wager: &Wager) -> Result<Settlement> {
    Settlement::of(wager).ok_or(WagerError::NotFinished(wager.id()))
}

/// Commits a claimed flag together with the payout it unlocks. The entity
/// lands before the escrow moves.
pub(crate) fn commit_payout(
    ledger: &mut Ledger,
    wager: Wager,
    to: &Address,
    amount: Amount,
    event: Event,
    now: i64,
) -> Result<()> {
    let mut commit = Commit::new(wager, now).event(event);
    if !amount.is_zero() {
        commit = commit.transfer(Transfer::Payout {
            to: to.clone(),
            amount,
        });
    }
    ledger.commit(commit)?;
    Ok(())
}
