use thiserror::Error;

use crate::amount::AmountError;
use crate::provider::ProviderError;
use crate::transaction::TransactionStatus;

/// Shown when a required transfer field is blank.
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all required fields";
/// Shown when an on-chain transfer could not be completed.
pub const TRANSFER_FAILED_MESSAGE: &str = "Transaction failed. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no wallet provider available")]
    ProviderUnavailable,

    #[error("wallet request failed: {0}")]
    ProviderRequestFailed(#[from] ProviderError),

    #[error("wallet is not connected")]
    NotConnected,
}

impl SessionError {
    /// Transient, user-facing status line.
    pub fn status_message(&self) -> String {
        match self {
            Self::ProviderUnavailable => {
                "Please install MetaMask (or another browser wallet) to use this app!".to_string()
            }
            Self::ProviderRequestFailed(e) if e.user_rejected() => {
                "Request rejected in wallet.".to_string()
            }
            Self::ProviderRequestFailed(_) => {
                "Wallet request failed. Please try again.".to_string()
            }
            Self::NotConnected => "Please connect your wallet first.".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("failed to read ledger snapshot: {0}")]
    PersistenceRead(String),

    #[error("failed to write ledger snapshot: {0}")]
    PersistenceWrite(String),

    #[error("no transaction with id {0}")]
    UnknownRecord(String),

    #[error("transaction {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("transaction {0} already has a hash")]
    HashAlreadySet(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("transaction {id} failed: {source}")]
    Provider { id: String, source: ProviderError },

    #[error("transaction {0} reverted")]
    Reverted(String),
}

impl TransferError {
    /// Transient, user-facing status line.
    pub fn status_message(&self) -> String {
        match self {
            Self::MissingField(_) => MISSING_FIELDS_MESSAGE.to_string(),
            Self::Amount(_) | Self::ZeroAmount => "Please enter a valid amount.".to_string(),
            Self::Session(e) => e.status_message(),
            Self::Provider { .. } | Self::Reverted(_) => TRANSFER_FAILED_MESSAGE.to_string(),
        }
    }
}
