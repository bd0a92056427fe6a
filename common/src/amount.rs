//! Exact conversions between display-unit decimal strings and wei.
//!
//! Amounts never pass through floating point: user input is parsed as an
//! 18-decimal fixed-point number straight into integer wei.

use thiserror::Error;

/// Decimal places of the native asset (ether-style chains).
pub const ETHER_DECIMALS: u32 = 18;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount: {0:?}")]
    Invalid(String),
    #[error("amount {0:?} has more than 18 decimal places")]
    TooPrecise(String),
    #[error("amount {0:?} is out of range")]
    Overflow(String),
}

/// Parse a decimal string in display units (e.g. `"0.5"`) into wei.
pub fn parse_ether(value: &str) -> Result<u128, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
        return Err(AmountError::Invalid(value.to_string()));
    }
    if frac.len() > ETHER_DECIMALS as usize {
        return Err(AmountError::TooPrecise(value.to_string()));
    }

    let overflow = || AmountError::Overflow(value.to_string());
    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(WEI_PER_ETHER)
            .ok_or_else(overflow)?
    };
    let frac_wei = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<18}")
            .parse::<u128>()
            .map_err(|_| AmountError::Invalid(value.to_string()))?
    };

    whole_wei.checked_add(frac_wei).ok_or_else(overflow)
}

/// Format wei as a display-unit decimal string with no trailing zeros
/// (`2000000000000000000` → `"2.0"`, `500000000000000000` → `"0.5"`).
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return format!("{whole}.0");
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Canonical decimal form of a user-entered amount.
pub fn canonical_amount(value: &str) -> Result<String, AmountError> {
    parse_ether(value).map(format_ether)
}

/// Format wei rounded half-up to a fixed number of decimals.
pub fn format_balance(wei: u128, decimals: u32) -> String {
    let decimals = decimals.min(ETHER_DECIMALS);
    let unit = 10u128.pow(ETHER_DECIMALS - decimals);
    let mut rounded = wei / unit;
    if (wei % unit) * 2 >= unit && unit > 1 {
        rounded += 1;
    }

    if decimals == 0 {
        return rounded.to_string();
    }
    let scale = 10u128.pow(decimals);
    format!(
        "{}.{:0width$}",
        rounded / scale,
        rounded % scale,
        width = decimals as usize
    )
}

/// Parse an EIP-1193 hex quantity (`"0x1bc16d674ec80000"`).
pub fn parse_quantity(hex: &str) -> Result<u128, AmountError> {
    let digits = hex
        .trim()
        .strip_prefix("0x")
        .or_else(|| hex.trim().strip_prefix("0X"))
        .ok_or_else(|| AmountError::Invalid(hex.to_string()))?;
    if digits.is_empty() {
        return Err(AmountError::Invalid(hex.to_string()));
    }
    u128::from_str_radix(digits, 16).map_err(|_| {
        if digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            AmountError::Overflow(hex.to_string())
        } else {
            AmountError::Invalid(hex.to_string())
        }
    })
}

/// Encode a value as an EIP-1193 hex quantity.
pub fn to_quantity(value: u128) -> String {
    format!("{value:#x}")
}
