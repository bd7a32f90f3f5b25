use crate::roles::{Role, Scope};
use crate::types::{Address, Amount};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unauthorized: {address} does not hold {role} on {scope}")]
    Unauthorized {
        scope: Scope,
        role: Role,
        address: Address,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Insufficient custody: need {need}, have {available}")]
    InsufficientCustody { need: Amount, available: Amount },

    #[error("Nothing to withdraw for {0}")]
    NothingToWithdraw(Address),

    #[error("Wager {0} already exists")]
    DuplicateId(u64),

    #[error("Wager id {0} is reserved")]
    ReservedId(u64),

    #[error("Overflow in {0}")]
    Overflow(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
