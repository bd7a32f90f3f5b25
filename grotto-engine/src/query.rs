//! Read-only views over committed ledger state.

use crate::{Result, WagerError};
use grotto_core::{Address, Amount, EventRecord, Ledger, PoolStatus, Stats, Wager, WagerKind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Selection criteria for listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: Option<WagerKind>,
    pub status: Option<PoolStatus>,
    pub creator: Option<Address>,
    pub player: Option<Address>,
}

impl Filter {
    pub fn kind(mut self, kind: WagerKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn status(mut self, status: PoolStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn creator(mut self, creator: Address) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn player(mut self, player: Address) -> Self {
        self.player = Some(player);
        self
    }

    pub fn matches(&self, wager: &Wager) -> bool {
        let pool = wager.pool();
        self.kind.map_or(true, |k| wager.kind() == k)
            && self.status.map_or(true, |s| pool.status == s)
            && self.creator.as_ref().map_or(true, |c| &pool.creator == c)
            && self.player.as_ref().map_or(true, |p| pool.has_player(p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// One share owed to an address by a settled wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winning {
    pub id: u64,
    pub kind: WagerKind,
    pub amount: Amount,
    pub claimed: bool,
}

#[derive(Clone)]
pub struct Reader {
    ledger: Arc<RwLock<Ledger>>,
}

impl Reader {
    pub fn new(ledger: Arc<RwLock<Ledger>>) -> Self {
        Self { ledger }
    }

    pub fn get_by_id(&self, id: u64) -> Option<Wager> {
        self.ledger.read().get(id).cloned()
    }

    pub fn get_all(&self, kind: Option<WagerKind>) -> Vec<Wager> {
        let filter = Filter {
            kind,
            ..Filter::default()
        };
        self.select(&filter)
    }

    pub fn get_paginated(&self, filter: &Filter, page: usize, per_page: usize) -> Result<Page<Wager>> {
        if page == 0 || per_page == 0 {
            return Err(WagerError::invalid("Page and page size start at 1"));
        }

        let ledger = self.ledger.read();
        let matching: Vec<&Wager> = ledger.wagers().filter(|w| filter.matches(w)).collect();
        let items = matching
            .iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|w| (*w).clone())
            .collect();

        Ok(Page {
            items,
            page,
            per_page,
            total: matching.len(),
        })
    }

    /// Settled wagers, optionally of one kind.
    pub fn get_completed(&self, kind: Option<WagerKind>) -> Vec<Wager> {
        let filter = Filter {
            kind,
            status: Some(PoolStatus::Settled),
            ..Filter::default()
        };
        self.select(&filter)
    }

    pub fn get_open(&self, kind: Option<WagerKind>) -> Vec<Wager> {
        let filter = Filter {
            kind,
            status: Some(PoolStatus::Open),
            ..Filter::default()
        };
        self.select(&filter)
    }

    pub fn get_by_creator(&self, creator: &Address) -> Vec<Wager> {
        self.select(&Filter::default().creator(creator.clone()))
    }

    pub fn get_player_winnings(&self, player: &Address) -> Vec<Winning> {
        let ledger = self.ledger.read();
        ledger
            .wagers()
            .filter(|w| w.pool().is_settled())
            .flat_map(|w| {
                w.winner_shares()
                    .into_iter()
                    .filter(move |(winner, _)| winner == player)
                    .map(move |(winner, amount)| Winning {
                        id: w.id(),
                        kind: w.kind(),
                        amount,
                        claimed: w.winner_claimed(&winner),
                    })
            })
            .collect()
    }

    pub fn get_creator_winnings(&self, creator: &Address) -> Vec<Winning> {
        let ledger = self.ledger.read();
        ledger
            .wagers()
            .filter(|w| w.pool().is_settled() && &w.pool().creator == creator)
            .map(|w| Winning {
                id: w.id(),
                kind: w.kind(),
                amount: w.pool().creator_shares,
                claimed: w.pool().claimed_by_creator,
            })
            .collect()
    }

    pub fn get_stats(&self) -> Stats {
        self.ledger.read().stats().clone()
    }

    /// Withdrawable escrow balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.read().escrow().balance_of(account)
    }

    pub fn custody(&self) -> Amount {
        self.ledger.read().escrow().custody()
    }

    pub fn events_since(&self, seq: u64) -> Vec<EventRecord> {
        self.ledger.read().events_since(seq).to_vec()
    }

    fn select(&self, filter: &Filter) -> Vec<Wager> {
        self.ledger
            .read()
            .wagers()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::Grotto;
    use crate::pool::PoolParams;
    use crate::randomness::CommittedSeed;
    use grotto_core::{EngineConfig, ManualClock};

    fn populated() -> Grotto {
        let grotto = Grotto::new(
            EngineConfig::default(),
            Arc::new(CommittedSeed::new([5u8; 32])),
            Arc::new(ManualClock::new(0)),
        )
        .unwrap();
        grotto.bootstrap(&Address::from("operator"));

        for i in 0..7u64 {
            let creator = if i % 2 == 0 { "alice" } else { "bob" };
            grotto
                .create_lotto(
                    &Address::from(creator),
                    PoolParams::count_based(1, Amount::from_units(10)),
                )
                .unwrap();
        }
        grotto
    }

    #[test]
    fn test_pagination() {
        let reader = populated().reader();

        let page = reader.get_paginated(&Filter::default(), 2, 3).unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(
            page.items.iter().map(Wager::id).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
        assert!(page.has_next());

        let last = reader.get_paginated(&Filter::default(), 3, 3).unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_next());

        let past_end = reader.get_paginated(&Filter::default(), 9, 3).unwrap();
        assert!(past_end.items.is_empty());

        assert!(reader.get_paginated(&Filter::default(), 0, 3).is_err());
    }

    #[test]
    fn test_filters() {
        let grotto = populated();
        let reader = grotto.reader();
        let alice = Address::from("alice");

        assert_eq!(reader.get_by_creator(&alice).len(), 4);
        assert_eq!(reader.get_open(Some(WagerKind::Lotto)).len(), 7);
        assert!(reader.get_all(Some(WagerKind::Pot)).is_empty());

        grotto
            .play_lotto(&Address::from("carol"), 1, Amount::from_units(10))
            .unwrap();
        assert_eq!(reader.get_completed(None).len(), 1);

        let winnings = reader.get_player_winnings(&Address::from("carol"));
        assert_eq!(winnings.len(), 1);
        assert_eq!(winnings[0].amount, Amount::from_units(8));
        assert!(!winnings[0].claimed);

        let creator = reader.get_creator_winnings(&alice);
        assert_eq!(creator[0].amount, Amount::from_units(2));

        let filter = Filter::default()
            .creator(alice)
            .player(Address::from("carol"));
        let page = reader.get_paginated(&filter, 1, 10).unwrap();
        assert_eq!(page.total, 1);
    }
}
