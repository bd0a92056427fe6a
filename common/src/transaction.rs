use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::network::DEFAULT_CURRENCY;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    #[serde(alias = "WALLET_TO_WALLET")]
    WalletTransfer,
    #[serde(alias = "BANK_TO_BANK")]
    BankTransfer,
    #[serde(alias = "SMART_CONTRACT")]
    ContractInteraction,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WalletTransfer => "wallet-transfer",
            Self::BankTransfer => "bank-transfer",
            Self::ContractInteraction => "contract-interaction",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[serde(alias = "PENDING")]
    Pending,
    #[serde(alias = "CONFIRMED")]
    Confirmed,
    #[serde(alias = "FAILED")]
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Status only ever moves pending → confirmed | failed.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        *self == Self::Pending && next.is_terminal()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// One entry of the client-local ledger.
///
/// Field names are the persisted layout. Snapshots written by older builds
/// (`type`, `timestamp`, `hash`, upper-case enum values) still load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: TransactionKind,
    pub from: String,
    pub to: String,
    /// Decimal string in display units, canonicalised on entry (`"10"`
    /// is stored as `"10.0"`).
    pub amount: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Epoch milliseconds.
    #[serde(alias = "timestamp")]
    pub created_at: i64,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "hash")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransactionRecord {
    /// New pending record with a fresh id, stamped now.
    pub fn new(
        kind: TransactionKind,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        let created_at = now_millis();
        Self {
            id: generate_id(created_at),
            kind,
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
            currency: currency.into(),
            created_at,
            status: TransactionStatus::Pending,
            tx_hash: None,
            description: None,
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Blank descriptions are dropped.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
        self.tx_hash = Some(hash.into());
        self
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `tx-<epoch ms>-<8 hex digits>`; the random suffix keeps ids unique when
/// two records are created in the same millisecond.
pub fn generate_id(now_millis: i64) -> String {
    format!("tx-{now_millis}-{:08x}", rand::random::<u32>())
}
