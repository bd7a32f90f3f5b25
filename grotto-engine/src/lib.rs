//! Grotto wagering engines
//!
//! Counted lotteries, multi-winner guessing pots and single-winner pots,
//! settled against the shared ledger in `grotto-core` and driven through the
//! [`Grotto`] facade. Winner draws use an injected [`RandomnessProvider`] so
//! every selection can be replayed from a committed seed.

pub mod error;
pub mod facade;
pub mod lotto;
pub mod pool;
pub mod pot;
pub mod query;
pub mod randomness;
pub mod settlement;
pub mod single_winner;

pub use error::{Result, WagerError};
pub use facade::Grotto;
pub use lotto::LottoEngine;
pub use pool::{Call, PoolParams};
pub use pot::{CreatePot, PotEngine};
pub use query::{Filter, Page, Reader, Winning};
pub use randomness::{CommittedSeed, RandomnessProvider};
pub use settlement::{distribute, Distribution, Settlement};
pub use single_winner::SingleWinnerPotEngine;
