//! Grotto core - shared ledger layer for the wagering engines
//!
//! Holds the data model for lottos and pots, the role registry every engine
//! checks before mutating, the custodial escrow, the transactional ledger and
//! its SQLite snapshot store.

pub mod clock;
pub mod config;
pub mod error;
pub mod escrow;
pub mod ledger;
pub mod roles;
pub mod storage;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, ShareSplit, SplitPolicy};
pub use error::{CoreError, Result};
pub use escrow::{EntryKind, Escrow, EscrowEntry, Transfer};
pub use ledger::{Commit, Ledger, StatsDelta};
pub use roles::{Grant, Role, RoleRegistry, Scope};
pub use storage::{LedgerStore, Storage};
pub use types::{
    Address, Amount, Draw, Event, EventRecord, Guess, GuessComparison, Lotto, PoolStatus, Pot,
    PotKind, Stats, Wager, WagerKind, WagerPool, WinningKind,
};
