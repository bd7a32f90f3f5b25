//! Share distribution with integer math.
//!
//! Every unit of stakes ends up with exactly one party: winners get an equal
//! cut of the winner percentage, the platform its percentage, and the creator
//! everything else, including the integer-division dust.

use grotto_core::{Address, Amount, ShareSplit, Wager, WagerPool};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    pub per_winner: Amount,
    pub winners: u64,
    pub creator: Amount,
    pub platform: Amount,
    /// Dust from rounding, already included in `creator`.
    pub remainder: Amount,
}

impl Distribution {
    pub fn winners_total(&self) -> Amount {
        self.per_winner * self.winners
    }

    pub fn total(&self) -> Amount {
        self.winners_total() + self.creator + self.platform
    }
}

pub fn distribute(stakes: Amount, split: ShareSplit, winners: usize) -> Distribution {
    // No winner: the whole pool belongs to the creator
    if winners == 0 {
        return Distribution {
            per_winner: Amount::ZERO,
            winners: 0,
            creator: stakes,
            platform: Amount::ZERO,
            remainder: Amount::ZERO,
        };
    }

    let winners = winners as u64;
    let per_winner = stakes.percent(split.winner) / winners;
    let platform = stakes.percent(split.platform);
    let creator = stakes - per_winner * winners - platform;
    let remainder = creator - stakes.percent(split.creator);

    Distribution {
        per_winner,
        winners,
        creator,
        platform,
        remainder,
    }
}

/// Writes the creator/platform side of a distribution onto a pool.
pub(crate) fn apply(pool: &mut WagerPool, distribution: &Distribution, version: u32, now: i64) {
    pool.creator_shares = distribution.creator;
    pool.platform_shares = distribution.platform;
    pool.remainder = distribution.remainder;
    pool.policy_version = Some(version);
    pool.status = grotto_core::PoolStatus::Settled;
    pool.settled_at = Some(now);
}

/// Read-only view of a settled wager's payout table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: u64,
    pub winners: Vec<Address>,
    pub per_winner: Amount,
    pub creator_shares: Amount,
    pub platform_shares: Amount,
    pub remainder: Amount,
    pub stakes: Amount,
    pub policy_version: u32,
}

impl Settlement {
    pub fn of(wager: &Wager) -> Option<Self> {
        let pool = wager.pool();
        if !pool.is_settled() {
            return None;
        }

        let shares = wager.winner_shares();
        Some(Self {
            id: pool.id,
            per_winner: shares.first().map(|(_, a)| *a).unwrap_or(Amount::ZERO),
            winners: shares.into_iter().map(|(w, _)| w).collect(),
            creator_shares: pool.creator_shares,
            platform_shares: pool.platform_shares,
            remainder: pool.remainder,
            stakes: pool.stakes,
            policy_version: pool.policy_version.unwrap_or_default(),
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.per_winner * self.winners.len() as u64 + self.creator_shares + self.platform_shares
            == self.stakes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: u64) -> Amount {
        Amount::from_units(n)
    }

    #[test]
    fn test_single_winner_split() {
        let d = distribute(units(30), ShareSplit::new(80, 20, 0), 1);
        assert_eq!(d.per_winner, units(24));
        assert_eq!(d.creator, units(6));
        assert_eq!(d.platform, Amount::ZERO);
        assert_eq!(d.total(), units(30));
    }

    #[test]
    fn test_dust_goes_to_creator() {
        // 80% of 101 = 80.8 -> 80, split three ways -> 26 each, 2 dust
        let d = distribute(units(101), ShareSplit::new(80, 15, 5), 3);
        assert_eq!(d.per_winner, units(26));
        assert_eq!(d.platform, units(5));
        assert_eq!(d.creator, units(101 - 78 - 5));
        assert_eq!(d.remainder, d.creator - units(15));
        assert_eq!(d.total(), units(101));
    }

    #[test]
    fn test_no_winner_routes_everything_to_creator() {
        let d = distribute(units(55), ShareSplit::new(70, 20, 10), 0);
        assert_eq!(d.creator, units(55));
        assert_eq!(d.platform, Amount::ZERO);
        assert_eq!(d.winners_total(), Amount::ZERO);
    }

    #[test]
    fn test_conservation_over_awkward_values() {
        for stakes in [0u64, 1, 7, 99, 1_000_003, u64::MAX / 3] {
            for winners in 0..7 {
                let d = distribute(units(stakes), ShareSplit::new(70, 20, 10), winners);
                assert_eq!(d.total(), units(stakes));
            }
        }
    }
}
