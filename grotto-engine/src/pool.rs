//! Rules every wager variant shares: creation parameters, play admission,
//! closure and the creator/platform claims.

use crate::{Result, WagerError};
use grotto_core::{
    Address, Amount, Event, Ledger, PoolStatus, Role, RoleRegistry, Scope, Wager, WagerKind,
    WagerPool, WinningKind,
};
use serde::{Deserialize, Serialize};

/// Who is calling, through which component, and when.
pub struct Call<'a> {
    /// Component that dispatched the call (the facade).
    pub principal: &'a Address,
    /// End user on whose behalf the call runs.
    pub sender: &'a Address,
    pub roles: &'a RoleRegistry,
    pub now: i64,
}

impl<'a> Call<'a> {
    pub fn require_principal(&self, scope: Scope, role: Role) -> Result<()> {
        self.roles.require(scope, role, self.principal)?;
        Ok(())
    }

    pub fn require_sender(&self, scope: Scope, role: Role) -> Result<()> {
        self.roles.require(scope, role, self.sender)?;
        Ok(())
    }
}

/// Role gate every engine runs first: the dispatching principal needs `role`
/// on the engine's scope, and the engine itself must be a ledger admin.
pub(crate) fn authorize(engine: &Address, scope: Scope, call: &Call<'_>, role: Role) -> Result<()> {
    call.require_principal(scope, role)?;
    call.roles.require(Scope::Ledger, Role::Admin, engine)?;
    Ok(())
}

/// Creation parameters shared by lottos and pots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Requested id; the ledger allocates one when `None`.
    pub id: Option<u64>,
    pub start_time: i64,
    pub end_time: i64,
    pub max_participants: u32,
    pub bet_amount: Amount,
    pub winning_kind: WinningKind,
}

impl PoolParams {
    pub fn count_based(max_participants: u32, bet_amount: Amount) -> Self {
        Self {
            id: None,
            start_time: 0,
            end_time: 0,
            max_participants,
            bet_amount,
            winning_kind: WinningKind::CountBased,
        }
    }

    pub fn time_based(start_time: i64, end_time: i64, bet_amount: Amount) -> Self {
        Self {
            id: None,
            start_time,
            end_time,
            max_participants: 0,
            bet_amount,
            winning_kind: WinningKind::TimeBased,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub(crate) fn validate(&self, now: i64) -> Result<()> {
        if self.bet_amount.is_zero() {
            return Err(WagerError::invalid("Bet amount must be greater than 0"));
        }

        match self.winning_kind {
            WinningKind::CountBased => {
                if self.max_participants == 0 {
                    return Err(WagerError::invalid(
                        "Count based wagers need max participants greater than 0",
                    ));
                }
                if self.start_time != 0 || self.end_time != 0 {
                    return Err(WagerError::invalid(
                        "Count based wagers can not set start or end time",
                    ));
                }
            }
            WinningKind::TimeBased => {
                if self.max_participants != 0 {
                    return Err(WagerError::invalid(
                        "Time based wagers can not cap participants",
                    ));
                }
                if self.start_time >= self.end_time {
                    return Err(WagerError::invalid("Start time must be less than end time"));
                }
                if self.end_time <= now {
                    return Err(WagerError::invalid("End time must be in the future"));
                }
            }
        }

        Ok(())
    }
}

pub(crate) fn reserve_id(ledger: &Ledger, requested: Option<u64>) -> Result<u64> {
    ledger.reserve_id(requested).map_err(|e| match e {
        grotto_core::CoreError::DuplicateId(id) => {
            WagerError::invalid(format!("Wager id {} already exists", id))
        }
        grotto_core::CoreError::ReservedId(id) => {
            WagerError::invalid(format!("Wager id {} is reserved", id))
        }
        other => other.into(),
    })
}

pub(crate) fn new_pool(id: u64, creator: &Address, params: &PoolParams, now: i64) -> WagerPool {
    WagerPool {
        id,
        creator: creator.clone(),
        bet_amount: params.bet_amount,
        stakes: Amount::ZERO,
        max_participants: params.max_participants,
        start_time: params.start_time,
        end_time: params.end_time,
        winning_kind: params.winning_kind,
        status: PoolStatus::Open,
        players: Vec::new(),
        creator_shares: Amount::ZERO,
        platform_shares: Amount::ZERO,
        remainder: Amount::ZERO,
        claimed_by_creator: false,
        claimed_by_platform: false,
        policy_version: None,
        created_at: now,
        closed_at: None,
        settled_at: None,
    }
}

/// Loads a copy of a stored wager, checking it is of the expected kind.
pub(crate) fn load(ledger: &Ledger, id: u64, expected: WagerKind) -> Result<Wager> {
    let wager = ledger.get(id).ok_or(WagerError::NotFound(id))?;
    if wager.kind() != expected {
        return Err(WagerError::WrongKind {
            id,
            expected,
            actual: wager.kind(),
        });
    }
    Ok(wager.clone())
}

/// Admission checks for a play. Nothing is mutated.
pub(crate) fn check_play(pool: &WagerPool, sender: &Address, value: Amount, now: i64) -> Result<()> {
    if &pool.creator == sender {
        return Err(WagerError::CreatorCannotPlay(pool.id));
    }

    if pool.is_finished() {
        return Err(WagerError::AlreadyFinished(pool.id));
    }

    if value < pool.bet_amount {
        return Err(WagerError::StakeTooLow {
            need: pool.bet_amount,
            offered: value,
        });
    }

    if pool.winning_kind == WinningKind::TimeBased {
        if now < pool.start_time {
            return Err(WagerError::NotStarted(pool.id));
        }
        if now >= pool.end_time {
            return Err(WagerError::AlreadyEnded(pool.id));
        }
    }

    if pool.has_player(sender) {
        return Err(WagerError::AlreadyPlayed {
            id: pool.id,
            player: sender.clone(),
        });
    }

    Ok(())
}

pub(crate) fn record_play(pool: &mut WagerPool, sender: &Address, value: Amount) -> Result<Event> {
    pool.stakes = pool
        .stakes
        .checked_add(value)
        .ok_or_else(|| WagerError::invalid("Stake overflows pool"))?;
    pool.players.push(sender.clone());

    tracing::info!(
        "{} played wager {} with {} ({} players)",
        sender,
        pool.id,
        value,
        pool.players.len()
    );

    Ok(Event::BetPlaced {
        id: pool.id,
        player: sender.clone(),
        amount: value,
    })
}

pub(crate) fn close(pool: &mut WagerPool, now: i64) -> Event {
    pool.status = PoolStatus::Closed;
    pool.closed_at = Some(now);
    tracing::info!("Wager {} closed", pool.id);
    Event::PoolClosed { id: pool.id }
}

/// Gate for explicit closure: the pool must be open and its condition met.
pub(crate) fn check_end(pool: &WagerPool, now: i64) -> Result<()> {
    if pool.is_finished() {
        return Err(WagerError::AlreadyFinished(pool.id));
    }
    if !pool.closure_reached(now) {
        return Err(WagerError::NotFinished(pool.id));
    }
    Ok(())
}

/// Marks the creator share claimed and returns the amount owed.
pub(crate) fn take_creator_share(pool: &mut WagerPool, sender: &Address) -> Result<Amount> {
    if !pool.is_settled() {
        return Err(WagerError::NotFinished(pool.id));
    }
    if &pool.creator != sender {
        return Err(WagerError::NotCreator(sender.clone()));
    }
    if pool.claimed_by_creator {
        return Err(WagerError::AlreadyClaimed(pool.id));
    }

    pool.claimed_by_creator = true;
    Ok(pool.creator_shares)
}

/// Marks the platform share claimed and returns the amount owed.
pub(crate) fn take_platform_share(pool: &mut WagerPool) -> Result<Amount> {
    if !pool.is_settled() {
        return Err(WagerError::NotFinished(pool.id));
    }
    if pool.claimed_by_platform {
        return Err(WagerError::AlreadyClaimed(pool.id));
    }
    if pool.platform_shares.is_zero() {
        return Err(WagerError::NothingToClaim(pool.id));
    }

    pool.claimed_by_platform = true;
    Ok(pool.platform_shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: u64) -> Amount {
        Amount::from_units(n)
    }

    #[test]
    fn test_validate_closure_modes() {
        let now = 1_000;
        assert!(PoolParams::count_based(3, units(10)).validate(now).is_ok());
        assert!(PoolParams::count_based(0, units(10)).validate(now).is_err());
        assert!(PoolParams::count_based(3, Amount::ZERO).validate(now).is_err());

        assert!(PoolParams::time_based(now, now + 60, units(10))
            .validate(now)
            .is_ok());
        assert!(PoolParams::time_based(now + 60, now + 60, units(10))
            .validate(now)
            .is_err());
        assert!(PoolParams::time_based(now - 120, now - 60, units(10))
            .validate(now)
            .is_err());

        let mut both = PoolParams::time_based(now, now + 60, units(10));
        both.max_participants = 3;
        assert!(both.validate(now).is_err());
    }

    #[test]
    fn test_check_play_order() {
        let creator = Address::from("creator");
        let alice = Address::from("alice");
        let mut pool = new_pool(1, &creator, &PoolParams::time_based(100, 200, units(10)), 50);

        assert!(matches!(
            check_play(&pool, &creator, units(10), 150),
            Err(WagerError::CreatorCannotPlay(1))
        ));
        assert!(matches!(
            check_play(&pool, &alice, units(9), 150),
            Err(WagerError::StakeTooLow { .. })
        ));
        assert!(matches!(
            check_play(&pool, &alice, units(10), 99),
            Err(WagerError::NotStarted(1))
        ));
        assert!(matches!(
            check_play(&pool, &alice, units(10), 200),
            Err(WagerError::AlreadyEnded(1))
        ));
        assert!(check_play(&pool, &alice, units(10), 150).is_ok());

        record_play(&mut pool, &alice, units(12)).unwrap();
        assert_eq!(pool.stakes, units(12));
        assert!(matches!(
            check_play(&pool, &alice, units(10), 150),
            Err(WagerError::AlreadyPlayed { .. })
        ));

        close(&mut pool, 150);
        assert!(matches!(
            check_play(&pool, &Address::from("bob"), units(10), 150),
            Err(WagerError::AlreadyFinished(1))
        ));
    }
}
