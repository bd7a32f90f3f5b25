use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// Account identifier for creators, players and the platform operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Value in the engine's single native unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub const fn to_units(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// `floor(self * pct / 100)`, computed without intermediate overflow.
    pub fn percent(self, pct: u8) -> Amount {
        Amount((self.0 as u128 * pct as u128 / 100) as u64)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} units", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = *self - rhs;
    }
}

impl Mul<u64> for Amount {
    type Output = Amount;

    fn mul(self, rhs: u64) -> Amount {
        Amount(self.0 * rhs)
    }
}

impl Div<u64> for Amount {
    type Output = Amount;

    fn div(self, rhs: u64) -> Amount {
        Amount(self.0 / rhs)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WagerKind {
    Lotto,
    Pot,
    SingleWinnerPot,
}

impl WagerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerKind::Lotto => "lotto",
            WagerKind::Pot => "pot",
            WagerKind::SingleWinnerPot => "single_winner_pot",
        }
    }
}

impl fmt::Display for WagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WagerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lotto" => Ok(WagerKind::Lotto),
            "pot" => Ok(WagerKind::Pot),
            "single_winner_pot" | "sw-pot" | "single" => Ok(WagerKind::SingleWinnerPot),
            other => Err(format!("unknown wager kind '{}'", other)),
        }
    }
}

/// How a pool decides it is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinningKind {
    /// Closes once `max_participants` players have played.
    CountBased,
    /// Closes once `end_time` has passed.
    TimeBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuessComparison {
    /// Same multiset of numbers, any order.
    NumbersOnly,
    /// Same numbers in the same positions.
    ExactOrder,
}

impl GuessComparison {
    pub fn matches(&self, target: &[u32], guess: &[u32]) -> bool {
        if target.len() != guess.len() {
            return false;
        }

        match self {
            GuessComparison::ExactOrder => target == guess,
            GuessComparison::NumbersOnly => {
                let mut a = target.to_vec();
                let mut b = guess.to_vec();
                a.sort_unstable();
                b.sort_unstable();
                a == b
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PotKind {
    MultiWinner,
    SingleWinner,
}

/// Lifecycle of a pool. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoolStatus {
    Open,
    Closed,
    Settled,
}

impl PoolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolStatus::Open => "open",
            PoolStatus::Closed => "closed",
            PoolStatus::Settled => "settled",
        }
    }
}

/// State shared by every wager variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagerPool {
    pub id: u64,
    pub creator: Address,
    pub bet_amount: Amount,
    pub stakes: Amount,
    pub max_participants: u32,
    pub start_time: i64,
    pub end_time: i64,
    pub winning_kind: WinningKind,
    pub status: PoolStatus,
    pub players: Vec<Address>,
    pub creator_shares: Amount,
    pub platform_shares: Amount,
    /// Integer-division dust folded into `creator_shares` at settlement.
    pub remainder: Amount,
    pub claimed_by_creator: bool,
    pub claimed_by_platform: bool,
    pub policy_version: Option<u32>,
    pub created_at: i64,
    pub closed_at: Option<i64>,
    pub settled_at: Option<i64>,
}

impl WagerPool {
    pub fn is_finished(&self) -> bool {
        self.status != PoolStatus::Open
    }

    pub fn is_settled(&self) -> bool {
        self.status == PoolStatus::Settled
    }

    pub fn has_player(&self, address: &Address) -> bool {
        self.players.iter().any(|p| p == address)
    }

    pub fn participant_cap_reached(&self) -> bool {
        self.winning_kind == WinningKind::CountBased
            && self.players.len() as u64 >= self.max_participants as u64
    }

    pub fn end_time_passed(&self, now: i64) -> bool {
        self.winning_kind == WinningKind::TimeBased && now >= self.end_time
    }

    /// Whether the configured closure condition holds at `now`.
    pub fn closure_reached(&self, now: i64) -> bool {
        self.participant_cap_reached() || self.end_time_passed(now)
    }
}

/// Record of a lotto draw, enough to replay the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub seed_commitment: String,
    pub index: u64,
    pub participants: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lotto {
    pub pool: WagerPool,
    pub winner: Option<Address>,
    pub winning_amount: Amount,
    pub claimed_by_winner: bool,
    pub draw: Option<Draw>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub player: Address,
    pub numbers: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pot {
    pub pool: WagerPool,
    pub pot_kind: PotKind,
    pub winning_numbers: Vec<u32>,
    pub comparison: GuessComparison,
    pub guesses: Vec<Guess>,
    pub winners: Vec<Address>,
    pub winner_share: Amount,
    pub claimed: BTreeSet<Address>,
}

impl Pot {
    pub fn kind(&self) -> WagerKind {
        match self.pot_kind {
            PotKind::MultiWinner => WagerKind::Pot,
            PotKind::SingleWinner => WagerKind::SingleWinnerPot,
        }
    }

    pub fn is_winner(&self, address: &Address) -> bool {
        self.winners.iter().any(|w| w == address)
    }

    pub fn guess_of(&self, address: &Address) -> Option<&[u32]> {
        self.guesses
            .iter()
            .find(|g| &g.player == address)
            .map(|g| g.numbers.as_slice())
    }

    pub fn winner_claims(&self) -> usize {
        self.claimed.len()
    }
}

/// Any stored wager entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Wager {
    Lotto(Lotto),
    Pot(Pot),
}

impl Wager {
    pub fn pool(&self) -> &WagerPool {
        match self {
            Wager::Lotto(lotto) => &lotto.pool,
            Wager::Pot(pot) => &pot.pool,
        }
    }

    pub fn id(&self) -> u64 {
        self.pool().id
    }

    pub fn kind(&self) -> WagerKind {
        match self {
            Wager::Lotto(_) => WagerKind::Lotto,
            Wager::Pot(pot) => pot.kind(),
        }
    }

    /// Winner addresses with the amount each is owed.
    pub fn winner_shares(&self) -> Vec<(Address, Amount)> {
        match self {
            Wager::Lotto(lotto) => lotto
                .winner
                .iter()
                .map(|w| (w.clone(), lotto.winning_amount))
                .collect(),
            Wager::Pot(pot) => pot
                .winners
                .iter()
                .map(|w| (w.clone(), pot.winner_share))
                .collect(),
        }
    }

    /// Whether `address` has already taken its winner share.
    pub fn winner_claimed(&self, address: &Address) -> bool {
        match self {
            Wager::Lotto(lotto) => {
                lotto.claimed_by_winner && lotto.winner.as_ref() == Some(address)
            }
            Wager::Pot(pot) => pot.claimed.contains(address),
        }
    }
}

/// Observable side effects, in commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LottoCreated {
        id: u64,
        creator: Address,
    },
    PotCreated {
        id: u64,
        creator: Address,
        kind: WagerKind,
    },
    BetPlaced {
        id: u64,
        player: Address,
        amount: Amount,
    },
    PoolClosed {
        id: u64,
    },
    PoolSettled {
        id: u64,
        winners: Vec<Address>,
    },
    Claimed {
        id: u64,
        winner: Address,
        amount: Amount,
    },
    CreatorClaimed {
        id: u64,
        creator: Address,
        amount: Amount,
    },
    PlatformClaimed {
        id: u64,
        platform: Address,
        amount: Amount,
    },
    Withdrawn {
        account: Address,
        amount: Amount,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::LottoCreated { .. } => "LottoCreated",
            Event::PotCreated { .. } => "PotCreated",
            Event::BetPlaced { .. } => "BetPlaced",
            Event::PoolClosed { .. } => "PoolClosed",
            Event::PoolSettled { .. } => "PoolSettled",
            Event::Claimed { .. } => "Claimed",
            Event::CreatorClaimed { .. } => "CreatorClaimed",
            Event::PlatformClaimed { .. } => "PlatformClaimed",
            Event::Withdrawn { .. } => "Withdrawn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: i64,
    pub event: Event,
}

/// Aggregate platform statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_played: Amount,
    pub total_players: u64,
    pub total_games: u64,
    pub total_lotto: u64,
    pub total_pot: u64,
    pub total_single_winner_pot: u64,
    pub total_creators: u64,
    pub total_creator_shares: Amount,
    pub total_platform_shares: Amount,
    pub total_player_shares: Amount,
}
