//! Decimal price parsing.
//!
//! Upstream reports every price as a decimal string. An empty string means
//! the price is not set, which is distinct from an explicit `"0"`.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// A price string that is neither empty nor a decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid price amount: {0:?}")]
pub struct PriceError(pub String);

/// Parse an upstream price string.
///
/// Returns `Ok(None)` for an empty or whitespace-only string.
///
/// # Errors
///
/// Returns `PriceError` if the string is not a decimal number.
///
/// # Example
///
/// ```
/// use catalog_proxy_core::parse_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_amount("19.90").unwrap(), Some(Decimal::new(1990, 2)));
/// assert_eq!(parse_amount("").unwrap(), None);
/// assert!(parse_amount("n/a").is_err());
/// ```
pub fn parse_amount(raw: &str) -> Result<Option<Decimal>, PriceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(trimmed)
        .map(Some)
        .map_err(|_| PriceError(raw.to_string()))
}

/// Parse a price string, keeping it only when it is strictly positive.
///
/// Malformed amounts are treated as absent; a catalog entry with a broken
/// price must still be listable.
#[must_use]
pub fn positive_amount(raw: &str) -> Option<Decimal> {
    parse_amount(raw)
        .ok()
        .flatten()
        .filter(|amount| *amount > Decimal::ZERO)
}
