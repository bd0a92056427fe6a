use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dbank_common::{TransactionKind, TransactionStatus, WalletConfig};

/// Account the simulated wallet exposes unless `--mock-account` says otherwise.
pub const DEFAULT_MOCK_ACCOUNT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

#[derive(Parser, Debug)]
#[command(name = "dbank", about = "dbank wallet session and transaction ledger")]
pub struct Cli {
    /// Directory holding the persisted transaction ledger.
    #[arg(long, env = "DBANK_DATA_DIR", default_value = ".dbank")]
    pub data_dir: PathBuf,

    /// JSON configuration file (camelCase keys, every field optional).
    #[arg(long, env = "DBANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store key of the ledger snapshot. Overrides the config file.
    #[arg(long, env = "DBANK_LEDGER_KEY")]
    pub ledger_key: Option<String>,

    /// Artificial bank transfer delay in milliseconds. Overrides the config file.
    #[arg(long, env = "DBANK_BANK_DELAY_MS")]
    pub bank_delay_ms: Option<u64>,

    /// Address of the simulated wallet account.
    #[arg(long, default_value = DEFAULT_MOCK_ACCOUNT)]
    pub mock_account: String,

    /// Starting balance of the simulated account, in ETH.
    #[arg(long, default_value = "10")]
    pub mock_balance: String,

    /// Chain id reported by the simulated wallet (hex).
    #[arg(long, default_value = "0x1")]
    pub mock_chain: String,

    /// Behave as if no wallet extension were installed.
    #[arg(long)]
    pub no_wallet: bool,

    /// Debug logging when RUST_LOG is unset.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect the wallet and print the dashboard.
    Status,
    /// Send the native asset from the connected wallet.
    Send(TransferArgs),
    /// Simulate a bank-to-crypto transfer.
    Bank(TransferArgs),
    /// List recorded transactions, newest first.
    List(ListArgs),
    /// Scripted walk through connect, account and network switches,
    /// transfers and disconnect.
    Demo,
}

#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
    /// Recipient address.
    #[arg(long, default_value = "")]
    pub to: String,

    /// Amount in display units (e.g. 0.5).
    #[arg(long, default_value = "")]
    pub amount: String,

    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// wallet-transfer, bank-transfer or contract-interaction.
    #[arg(long, value_parser = parse_kind)]
    pub kind: Option<TransactionKind>,

    /// pending, confirmed or failed.
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TransactionStatus>,

    /// Case-insensitive match on addresses and description.
    #[arg(long)]
    pub search: Option<String>,

    /// Print the records as JSON.
    #[arg(long)]
    pub json: bool,
}

// Both enums already accept their wire names (and legacy aliases) through serde.
fn parse_kind(raw: &str) -> Result<TransactionKind, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown transaction kind '{raw}'"))
}

fn parse_status(raw: &str) -> Result<TransactionStatus, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown transaction status '{raw}'"))
}

impl Cli {
    /// Config file (if any) with flag/env overrides applied.
    pub fn wallet_config(&self) -> Result<WalletConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                WalletConfig::from_json(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => WalletConfig::default(),
        };
        if let Some(key) = &self.ledger_key {
            config.ledger_key = key.clone();
        }
        if let Some(ms) = self.bank_delay_ms {
            config.bank_transfer_delay_ms = ms;
        }
        Ok(config)
    }
}
