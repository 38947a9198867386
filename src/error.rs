//! Crate-wide error type.
//!
//! Variants fall into four groups that the transport layer maps to distinct
//! HTTP statuses: input errors (rejected before any external call),
//! precondition errors (unknown account, insufficient balance), external
//! dependency errors (chain lookups that the client may retry), and
//! orchestration errors after the fee commitment point.

use primitive_types::U256;

use crate::app::publisher::PublishStep;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("account {0} is not registered")]
    UnknownAccount(String),

    #[error("credit amount must be strictly positive")]
    InvalidAmount,

    #[error("insufficient balance: have {balance} wei, need {required} wei")]
    InsufficientBalance { balance: U256, required: U256 },

    /// Crediting would overflow the account balance. Treated as fatal for the
    /// request rather than silently wrapping.
    #[error("balance overflow while crediting account")]
    BalanceOverflow,

    #[error("transaction {0} not found on chain")]
    TxNotFound(String),

    #[error("transaction '{field}' address {actual} does not match expected {expected}")]
    AddressMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// Recoverable: the transaction exists but has no receipt yet.
    #[error("transaction {0} is not yet mined")]
    NotMined(String),

    #[error("transaction {0} failed on chain")]
    TransactionFailed(String),

    #[error("insufficient confirmations: observed {observed}, required {required}")]
    InsufficientConfirmations { observed: u64, required: u64 },

    #[error("transaction {0} transferred zero value")]
    ZeroValue(String),

    #[error("insufficient funds: balance {balance} wei, publish fee {required} wei")]
    InsufficientFunds { balance: U256, required: U256 },

    /// The publish workflow failed after the fee was debited. The fee is not
    /// refunded; the step name tells the operator where to reconcile.
    #[error("publish failed at the {step} step: {reason}")]
    PublishFailed { step: PublishStep, reason: String },

    /// A chain-B finalizing call timed out. The transaction may have landed,
    /// so the outcome must not be retried or assumed failed.
    #[error("{step} transaction timed out; on-chain outcome is unknown")]
    AmbiguousOutcome { step: PublishStep },

    #[error("rpc request timed out")]
    RpcTimeout,

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl Error {
    /// Stable machine-readable kind string reported on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedInput(_) => "MalformedInput",
            Error::UnknownAccount(_) => "UnknownAccount",
            Error::InvalidAmount => "InvalidAmount",
            Error::InsufficientBalance { .. } => "InsufficientBalance",
            Error::BalanceOverflow => "BalanceOverflow",
            Error::TxNotFound(_) => "NotFound",
            Error::AddressMismatch { .. } => "AddressMismatch",
            Error::NotMined(_) => "NotMined",
            Error::TransactionFailed(_) => "TransactionFailed",
            Error::InsufficientConfirmations { .. } => "InsufficientConfirmations",
            Error::ZeroValue(_) => "ZeroValue",
            Error::InsufficientFunds { .. } => "InsufficientFunds",
            Error::PublishFailed { .. } => "PublishFailed",
            Error::AmbiguousOutcome { .. } => "AmbiguousOutcome",
            Error::RpcTimeout => "RpcTimeout",
            Error::Rpc(_) => "RpcError",
        }
    }
}
