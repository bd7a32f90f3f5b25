use grotto_core::{Address, Amount, CoreError, Role, Scope, WagerKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WagerError>;

#[derive(Error, Debug)]
pub enum WagerError {
    // Validation
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid winning numbers: {0}")]
    InvalidWinningNumbers(String),

    #[error("Invalid guess: expected {expected} numbers, got {got}")]
    InvalidGuess { expected: usize, got: usize },

    // Lookup
    #[error("Wager {0} does not exist")]
    NotFound(u64),

    #[error("Wager {id} is a {actual}, not a {expected}")]
    WrongKind {
        id: u64,
        expected: WagerKind,
        actual: WagerKind,
    },

    // Lifecycle
    #[error("Wager {0} is finished")]
    AlreadyFinished(u64),

    #[error("Wager {0} is not finished")]
    NotFinished(u64),

    #[error("Wager {0} has not started")]
    NotStarted(u64),

    #[error("Wager {0} has ended")]
    AlreadyEnded(u64),

    #[error("Stake too low: need {need}, offered {offered}")]
    StakeTooLow { need: Amount, offered: Amount },

    #[error("{player} already played wager {id}")]
    AlreadyPlayed { id: u64, player: Address },

    #[error("Wager {0} is already claimed")]
    AlreadyClaimed(u64),

    #[error("Nothing to claim on wager {0}")]
    NothingToClaim(u64),

    #[error("Creator can't claim wager {0} until at least one winner claimed")]
    CreatorCannotClaimYet(u64),

    // Authorization
    #[error("Creator can not play wager {0}")]
    CreatorCannotPlay(u64),

    #[error("{0} is not a winner")]
    NotAWinner(Address),

    #[error("{0} is not the creator")]
    NotCreator(Address),

    #[error("Unauthorized: {address} does not hold {role} on {scope}")]
    Unauthorized {
        scope: Scope,
        role: Role,
        address: Address,
    },

    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for WagerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthorized {
                scope,
                role,
                address,
            } => WagerError::Unauthorized {
                scope,
                role,
                address,
            },
            other => WagerError::Core(other),
        }
    }
}

impl WagerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }
}
