use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Store key holding the serialized ledger.
pub const DEFAULT_LEDGER_KEY: &str = "transactions";

/// Synthetic sender of simulated bank transfers. A UI placeholder with no
/// settlement behind it.
pub const BANK_ADDRESS: &str = "0x89205A3A3b2A69De6Dbf7f01ED13B2108B2c43e7";

/// Runtime settings. Every field has a default, so a partial JSON document
/// (or `{}`) is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalletConfig {
    pub ledger_key: String,
    pub bank_address: String,
    pub bank_transfer_delay_ms: u64,
    /// How often browser providers poll for a transaction receipt.
    pub receipt_poll_interval_ms: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            ledger_key: DEFAULT_LEDGER_KEY.to_string(),
            bank_address: BANK_ADDRESS.to_string(),
            bank_transfer_delay_ms: 2_000,
            receipt_poll_interval_ms: 1_500,
        }
    }
}

impl WalletConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn bank_transfer_delay(&self) -> Duration {
        Duration::from_millis(self.bank_transfer_delay_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}
