//! Durable record of every wager, its escrowed value and the event log.
//!
//! Engines never mutate stored entities in place. They stage a modified copy
//! and hand it to [`Ledger::commit`] together with the value transfers and
//! events of the call. A commit is validated as a whole before anything is
//! written, so a rejected call leaves no trace.

use crate::error::{CoreError, Result};
use crate::escrow::{Escrow, Transfer};
use crate::types::{
    Address, Amount, Event, EventRecord, Lotto, Pot, Stats, Wager, WagerKind,
};
use std::collections::{BTreeMap, BTreeSet};

/// Changes to aggregate statistics carried by a commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsDelta {
    pub created: Option<WagerKind>,
    pub plays: u64,
    pub played: Amount,
    pub creator_shares: Amount,
    pub platform_shares: Amount,
    pub player_shares: Amount,
}

impl StatsDelta {
    pub fn created(kind: WagerKind) -> Self {
        Self {
            created: Some(kind),
            ..Self::default()
        }
    }

    pub fn played(amount: Amount) -> Self {
        Self {
            plays: 1,
            played: amount,
            ..Self::default()
        }
    }

    pub fn settled(creator: Amount, platform: Amount, players: Amount) -> Self {
        Self {
            creator_shares: creator,
            platform_shares: platform,
            player_shares: players,
            ..Self::default()
        }
    }

    /// Sums two deltas, failing instead of wrapping.
    pub fn merge(self, other: StatsDelta) -> Result<Self> {
        Ok(Self {
            created: self.created.or(other.created),
            plays: self
                .plays
                .checked_add(other.plays)
                .ok_or(CoreError::Overflow("play count"))?,
            played: add(self.played, other.played, "played total")?,
            creator_shares: add(self.creator_shares, other.creator_shares, "creator shares")?,
            platform_shares: add(self.platform_shares, other.platform_shares, "platform shares")?,
            player_shares: add(self.player_shares, other.player_shares, "player shares")?,
        })
    }
}

fn add(a: Amount, b: Amount, what: &'static str) -> Result<Amount> {
    a.checked_add(b).ok_or(CoreError::Overflow(what))
}

fn incr(n: u64, what: &'static str) -> Result<u64> {
    n.checked_add(1).ok_or(CoreError::Overflow(what))
}

/// Everything one engine call wants to write.
#[derive(Debug, Clone)]
pub struct Commit {
    pub wager: Wager,
    pub stats: Vec<StatsDelta>,
    pub transfers: Vec<Transfer>,
    pub events: Vec<Event>,
    pub timestamp: i64,
}

impl Commit {
    pub fn new(wager: Wager, timestamp: i64) -> Self {
        Self {
            wager,
            stats: Vec::new(),
            transfers: Vec::new(),
            events: Vec::new(),
            timestamp,
        }
    }

    pub fn stats(mut self, delta: StatsDelta) -> Self {
        self.stats.push(delta);
        self
    }

    pub fn deltas(mut self, deltas: impl IntoIterator<Item = StatsDelta>) -> Self {
        self.stats.extend(deltas);
        self
    }

    pub fn transfer(mut self, transfer: Transfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    pub fn event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pub(crate) next_id: u64,
    pub(crate) wagers: BTreeMap<u64, Wager>,
    pub(crate) creators: BTreeSet<Address>,
    pub(crate) stats: Stats,
    pub(crate) escrow: Escrow,
    pub(crate) events: Vec<EventRecord>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            wagers: BTreeMap::new(),
            creators: BTreeSet::new(),
            stats: Stats::default(),
            escrow: Escrow::new(),
            events: Vec::new(),
        }
    }

    /// Id a new wager would receive. A requested id is honoured only if unused.
    pub fn reserve_id(&self, requested: Option<u64>) -> Result<u64> {
        match requested {
            Some(id) if id == 0 || id == u64::MAX => Err(CoreError::ReservedId(id)),
            Some(id) if self.wagers.contains_key(&id) => Err(CoreError::DuplicateId(id)),
            Some(id) => Ok(id),
            None => {
                let mut id = self.next_id;
                while self.wagers.contains_key(&id) {
                    id = incr(id, "wager id")?;
                }
                if id == u64::MAX {
                    return Err(CoreError::ReservedId(id));
                }
                Ok(id)
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<&Wager> {
        self.wagers.get(&id)
    }

    pub fn kind_of(&self, id: u64) -> Option<WagerKind> {
        self.wagers.get(&id).map(Wager::kind)
    }

    pub fn lotto(&self, id: u64) -> Option<&Lotto> {
        match self.wagers.get(&id) {
            Some(Wager::Lotto(lotto)) => Some(lotto),
            _ => None,
        }
    }

    pub fn pot(&self, id: u64) -> Option<&Pot> {
        match self.wagers.get(&id) {
            Some(Wager::Pot(pot)) => Some(pot),
            _ => None,
        }
    }

    pub fn wagers(&self) -> impl Iterator<Item = &Wager> {
        self.wagers.values()
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn escrow(&self) -> &Escrow {
        &self.escrow
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn events_since(&self, seq: u64) -> &[EventRecord] {
        let start = self.events.partition_point(|e| e.seq <= seq);
        &self.events[start..]
    }

    pub fn last_seq(&self) -> u64 {
        self.events.last().map(|e| e.seq).unwrap_or(0)
    }

    /// Writes a staged change. Either all of it lands or none of it does.
    ///
    /// The entity (with its claimed flags) is stored before value moves.
    pub fn commit(&mut self, commit: Commit) -> Result<()> {
        let Commit {
            wager,
            stats,
            transfers,
            events,
            timestamp,
        } = commit;

        let delta = stats
            .into_iter()
            .try_fold(StatsDelta::default(), StatsDelta::merge)?;

        let id = wager.id();
        let exists = self.wagers.contains_key(&id);
        if delta.created.is_some() && exists {
            return Err(CoreError::DuplicateId(id));
        }
        if delta.created.is_none() && !exists {
            return Err(CoreError::internal(format!(
                "Commit for unknown wager {}",
                id
            )));
        }
        self.escrow.check(&transfers)?;

        let creator = wager.pool().creator.clone();
        let new_creator = delta.created.is_some() && !self.creators.contains(&creator);
        let next_stats = self.stats_after(&delta, new_creator)?;
        let next_id = match delta.created {
            Some(_) => self.next_id.max(incr(id, "wager id")?),
            None => self.next_id,
        };

        // Nothing below can fail.
        if new_creator {
            self.creators.insert(creator);
        }
        self.next_id = next_id;
        self.stats = next_stats;
        self.wagers.insert(id, wager);
        self.escrow.apply(id, transfers, timestamp);
        self.append_events(events, timestamp);

        tracing::debug!("Committed wager {} at {}", id, timestamp);
        Ok(())
    }

    fn stats_after(&self, delta: &StatsDelta, new_creator: bool) -> Result<Stats> {
        let mut next = self.stats.clone();
        if let Some(kind) = delta.created {
            next.total_games = incr(next.total_games, "game count")?;
            let per_kind = match kind {
                WagerKind::Lotto => &mut next.total_lotto,
                WagerKind::Pot => &mut next.total_pot,
                WagerKind::SingleWinnerPot => &mut next.total_single_winner_pot,
            };
            *per_kind = incr(*per_kind, "game count")?;
            if new_creator {
                next.total_creators = incr(next.total_creators, "creator count")?;
            }
        }
        next.total_players = next
            .total_players
            .checked_add(delta.plays)
            .ok_or(CoreError::Overflow("play count"))?;
        next.total_played = add(next.total_played, delta.played, "played total")?;
        next.total_creator_shares =
            add(next.total_creator_shares, delta.creator_shares, "creator shares")?;
        next.total_platform_shares =
            add(next.total_platform_shares, delta.platform_shares, "platform shares")?;
        next.total_player_shares =
            add(next.total_player_shares, delta.player_shares, "player shares")?;
        Ok(next)
    }

    /// Moves an account's accumulated payouts out of the engine.
    pub fn withdraw(&mut self, account: &Address, timestamp: i64) -> Result<Amount> {
        let amount = self.escrow.withdraw(account, timestamp)?;
        self.append_events(
            vec![Event::Withdrawn {
                account: account.clone(),
                amount,
            }],
            timestamp,
        );
        tracing::info!("{} withdrew {}", account, amount);
        Ok(amount)
    }

    fn append_events(&mut self, events: Vec<Event>, timestamp: i64) {
        let mut seq = self.last_seq();
        for event in events {
            seq += 1;
            self.events.push(EventRecord {
                seq,
                timestamp,
                event,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PoolStatus, WagerPool, WinningKind};

    fn lotto(id: u64, creator: &str) -> Wager {
        Wager::Lotto(Lotto {
            pool: WagerPool {
                id,
                creator: Address::from(creator),
                bet_amount: Amount::from_units(10),
                stakes: Amount::ZERO,
                max_participants: 3,
                start_time: 0,
                end_time: 0,
                winning_kind: WinningKind::CountBased,
                status: PoolStatus::Open,
                players: Vec::new(),
                creator_shares: Amount::ZERO,
                platform_shares: Amount::ZERO,
                remainder: Amount::ZERO,
                claimed_by_creator: false,
                claimed_by_platform: false,
                policy_version: None,
                created_at: 0,
                closed_at: None,
                settled_at: None,
            },
            winner: None,
            winning_amount: Amount::ZERO,
            claimed_by_winner: false,
            draw: None,
        })
    }

    #[test]
    fn test_create_commit_updates_stats_and_ids() {
        let mut ledger = Ledger::new();
        let id = ledger.reserve_id(None).unwrap();
        assert_eq!(id, 1);

        ledger
            .commit(
                Commit::new(lotto(id, "alice"), 10)
                    .stats(StatsDelta::created(WagerKind::Lotto))
                    .event(Event::LottoCreated {
                        id,
                        creator: Address::from("alice"),
                    }),
            )
            .unwrap();

        assert_eq!(ledger.reserve_id(None).unwrap(), 2);
        assert!(matches!(
            ledger.reserve_id(Some(1)),
            Err(CoreError::DuplicateId(1))
        ));
        assert_eq!(ledger.stats().total_games, 1);
        assert_eq!(ledger.stats().total_lotto, 1);
        assert_eq!(ledger.stats().total_creators, 1);
        assert_eq!(ledger.events().len(), 1);
        assert_eq!(ledger.events()[0].seq, 1);
    }

    #[test]
    fn test_rejected_commit_writes_nothing() {
        let mut ledger = Ledger::new();
        ledger
            .commit(Commit::new(lotto(1, "alice"), 10).stats(StatsDelta::created(WagerKind::Lotto)))
            .unwrap();

        let result = ledger.commit(
            Commit::new(lotto(1, "alice"), 11)
                .stats(StatsDelta::played(Amount::from_units(5)))
                .transfer(Transfer::Payout {
                    to: Address::from("mallory"),
                    amount: Amount::from_units(5),
                })
                .event(Event::PoolClosed { id: 1 }),
        );

        assert!(matches!(result, Err(CoreError::InsufficientCustody { .. })));
        assert_eq!(ledger.stats().total_players, 0);
        assert_eq!(ledger.events().len(), 0);
        assert_eq!(ledger.escrow().custody(), Amount::ZERO);
    }

    #[test]
    fn test_events_since() {
        let mut ledger = Ledger::new();
        ledger
            .commit(
                Commit::new(lotto(1, "alice"), 10)
                    .stats(StatsDelta::created(WagerKind::Lotto))
                    .events(vec![Event::PoolClosed { id: 1 }, Event::PoolClosed { id: 1 }]),
            )
            .unwrap();

        assert_eq!(ledger.events_since(0).len(), 2);
        assert_eq!(ledger.events_since(1).len(), 1);
        assert!(ledger.events_since(2).is_empty());
    }

    #[test]
    fn test_stats_overflow_rejects_whole_commit() {
        let mut ledger = Ledger::new();
        let big = Amount::from_units(u64::MAX - 10);
        ledger
            .commit(Commit::new(lotto(1, "alice"), 10).stats(StatsDelta::created(WagerKind::Lotto)))
            .unwrap();
        ledger
            .commit(
                Commit::new(lotto(1, "alice"), 11)
                    .stats(StatsDelta::played(big))
                    .transfer(Transfer::Stake {
                        from: Address::from("bob"),
                        amount: big,
                    })
                    .transfer(Transfer::Payout {
                        to: Address::from("bob"),
                        amount: big,
                    }),
            )
            .unwrap();
        ledger.withdraw(&Address::from("bob"), 12).unwrap();
        assert_eq!(ledger.escrow().custody(), Amount::ZERO);
        let events = ledger.events().len();

        let mut staged = lotto(1, "alice");
        if let Wager::Lotto(l) = &mut staged {
            l.pool.players.push(Address::from("carol"));
            l.pool.stakes = Amount::from_units(20);
        }
        let result = ledger.commit(
            Commit::new(staged, 13)
                .stats(StatsDelta::played(Amount::from_units(20)))
                .transfer(Transfer::Stake {
                    from: Address::from("carol"),
                    amount: Amount::from_units(20),
                })
                .event(Event::PoolClosed { id: 1 }),
        );

        assert!(matches!(result, Err(CoreError::Overflow(_))));
        assert!(ledger.get(1).unwrap().pool().players.is_empty());
        assert_eq!(ledger.escrow().custody(), Amount::ZERO);
        assert_eq!(ledger.stats().total_played, big);
        assert_eq!(ledger.stats().total_players, 1);
        assert_eq!(ledger.events().len(), events);
    }

    #[test]
    fn test_merge_overflow_is_an_error() {
        let full = StatsDelta::played(Amount::from_units(u64::MAX));
        assert!(matches!(
            full.clone().merge(StatsDelta::played(Amount::from_units(1))),
            Err(CoreError::Overflow(_))
        ));
        let merged = full
            .merge(StatsDelta::created(WagerKind::Pot))
            .unwrap();
        assert_eq!(merged.created, Some(WagerKind::Pot));
        assert_eq!(merged.plays, 1);
    }

    #[test]
    fn test_last_id_is_reserved() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.reserve_id(Some(u64::MAX)),
            Err(CoreError::ReservedId(u64::MAX))
        ));
        assert!(matches!(ledger.reserve_id(Some(0)), Err(CoreError::ReservedId(0))));

        let id = ledger.reserve_id(Some(u64::MAX - 1)).unwrap();
        ledger
            .commit(Commit::new(lotto(id, "alice"), 10).stats(StatsDelta::created(WagerKind::Lotto)))
            .unwrap();
        assert!(matches!(
            ledger.reserve_id(None),
            Err(CoreError::ReservedId(u64::MAX))
        ));
        assert!(matches!(
            ledger.commit(
                Commit::new(lotto(u64::MAX, "bob"), 11).stats(StatsDelta::created(WagerKind::Lotto))
            ),
            Err(CoreError::Overflow(_))
        ));
        assert_eq!(ledger.stats().total_creators, 1);
        assert_eq!(ledger.len(), 1);
    }
}
