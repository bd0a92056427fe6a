//! Chain identifiers and their display names.

use crate::provider::ProviderError;

/// Ticker used when the chain is unknown or disconnected.
pub const DEFAULT_CURRENCY: &str = "ETH";

/// Parse an EIP-1193 chain id (`"0x1"`). Decimal strings are accepted too,
/// some providers emit them on `chainChanged`.
pub fn parse_chain_id(raw: &str) -> Result<u64, ProviderError> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };
    parsed.map_err(|_| ProviderError::InvalidResponse(format!("bad chain id {raw:?}")))
}

/// Human-readable network name for the header badge.
pub fn network_name(chain_id: Option<u64>) -> String {
    let Some(id) = chain_id else {
        return "Unknown Network".to_string();
    };
    match id {
        1 => "Ethereum Mainnet".to_string(),
        3 => "Ropsten Testnet".to_string(),
        4 => "Rinkeby Testnet".to_string(),
        5 => "Goerli Testnet".to_string(),
        42 => "Kovan Testnet".to_string(),
        56 => "Binance Smart Chain".to_string(),
        137 => "Polygon Mainnet".to_string(),
        80001 => "Polygon Mumbai".to_string(),
        11155111 => "Sepolia Testnet".to_string(),
        other => format!("Chain ID: {other}"),
    }
}

/// Native asset ticker of a chain.
pub fn native_currency(chain_id: Option<u64>) -> &'static str {
    match chain_id {
        Some(56) => "BNB",
        Some(137) | Some(80001) => "MATIC",
        _ => DEFAULT_CURRENCY,
    }
}
