// fixtures/src/amount.rs
// Decimal amount <-> on-chain integer conversion

use ethers::{
    types::U256,
    utils::{format_units, parse_units},
};

use crate::{
    error::{FixtureError, Result},
    felt::Felt,
};

/// Largest decimal count whose scale factor `10^decimals` still fits in 256 bits.
pub const MAX_DECIMALS: u32 = 77;

/// Converts a human-scale decimal string into the token's integer amount.
///
/// `"10.5"` with 18 decimals is `10_500_000_000_000_000_000`. Fractional digits beyond
/// `decimals` are truncated toward zero, never rounded up, so `normalize_amount("1.23456", 2)`
/// is `123`.
///
/// Accepted forms are `12`, `12.34`, `.34` and `12.`, with surrounding whitespace ignored.
/// Signs, exponents, separators and anything else are rejected as `InvalidAmount`.
pub fn normalize_amount(amount: &str, decimals: u32) -> Result<U256> {
    let invalid = |reason: &str| FixtureError::InvalidAmount {
        amount: amount.to_string(),
        reason: reason.to_string(),
    };

    if decimals > MAX_DECIMALS {
        return Err(invalid(&format!(
            "{decimals} decimals exceeds the supported maximum of {MAX_DECIMALS}"
        )));
    }

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty amount"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("amount is negative"));
    }

    // parse_units accepts signs and `_` separators; only plain digits get through here.
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid("not a plain decimal number"));
    }

    // parse_units scales with an unchecked multiply; keep the result inside 256 bits.
    let unit = U256::exp10(decimals as usize);
    let kept_fraction = &fraction[..fraction.len().min(decimals as usize)];
    let headroom = if kept_fraction.bytes().any(|b| b != b'0') {
        unit - 1
    } else {
        U256::zero()
    };
    let fits = U256::from_dec_str(if whole.is_empty() { "0" } else { whole })
        .ok()
        .and_then(|units| units.checked_mul(unit))
        .and_then(|scaled| scaled.checked_add(headroom))
        .is_some();
    if !fits {
        return Err(invalid("does not fit in 256 bits"));
    }

    parse_units(trimmed, decimals)
        .map(U256::from)
        .map_err(|e| invalid(&e.to_string()))
}

/// Renders an integer amount with exactly `decimals` fractional digits.
/// `format_amount(123, 2)` is `"1.23"`; with zero decimals there is no dot.
pub fn format_amount(value: U256, decimals: u32) -> Result<String> {
    if decimals == 0 {
        return Ok(value.to_string());
    }
    format_units(value, decimals).map_err(|e| FixtureError::InvalidAmount {
        amount: value.to_string(),
        reason: e.to_string(),
    })
}

/// Interprets a `decimals()` response word.
pub fn decimals_from_felt(value: Felt) -> Result<u32> {
    value
        .to_u64()
        .filter(|d| *d <= u64::from(MAX_DECIMALS))
        .map(|d| d as u32)
        .ok_or_else(|| FixtureError::InvalidAmount {
            amount: value.to_hex(),
            reason: "token decimals are not a supported non-negative integer".to_string(),
        })
}
