use chrono::DateTime;

use crate::amount::{format_balance, parse_ether};

/// Decimals shown for balances and transaction amounts.
pub const DISPLAY_DECIMALS: u32 = 4;

/// Shorten an address for display: `0x1234...abcd`.
pub fn shorten_address(address: &str, chars: usize) -> String {
    if address.len() <= chars * 2 + 2 {
        return address.to_string();
    }
    match (
        address.get(..chars + 2),
        address.get(address.len() - chars..),
    ) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => address.to_string(),
    }
}

/// Format a display-unit amount with its ticker (`"0.5000 ETH"`).
/// Amounts that don't parse are shown verbatim.
pub fn format_currency(amount: &str, currency: &str) -> String {
    match parse_ether(amount) {
        Ok(wei) => format!("{} {currency}", format_balance(wei, DISPLAY_DECIMALS)),
        Err(_) => format!("{amount} {currency}"),
    }
}

/// Format epoch milliseconds as a UTC timestamp.
pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
