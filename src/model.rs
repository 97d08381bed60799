use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Column order of the CSV file and of the `exchange_rates` table.
pub const COLUMNS: [&str; 5] = ["currency", "rate", "base_currency", "date", "loaded_at"];

/// Body of the rates endpoint, e.g.
/// `{"amount":1.0,"base":"USD","date":"2024-01-01","rates":{"EUR":0.9}}`.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct RawResponse {
    pub base: Option<String>,
    pub date: Option<String>,
    /// Kept as raw JSON numbers; see [`parse_rate`].
    pub rates: Option<BTreeMap<String, Option<Number>>>,
}

/// Converts a JSON rate into a `Decimal` without losing its magnitude.
///
/// Fails for values outside `Decimal`'s range (beyond ~7.9e28 or with more
/// than 28 fractional digits) instead of rounding them to zero.
pub fn parse_rate(number: &Number) -> Result<Decimal, rust_decimal::Error> {
    if let Some(n) = number.as_i64() {
        return Ok(Decimal::from(n));
    }
    if let Some(n) = number.as_u64() {
        return Ok(Decimal::from(n));
    }

    let text = number.to_string();
    let rate = if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text)?
    } else {
        text.parse::<Decimal>()?
    };

    if rate.is_zero() && number.as_f64().is_some_and(|f| f != 0.0) {
        return Err(rust_decimal::Error::Underflow);
    }
    Ok(rate)
}

/// One normalized exchange rate: 1 `base_currency` buys `rate` units of `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub currency: String,
    pub rate: Decimal,
    pub base_currency: String,
    pub date: Option<String>,
    pub loaded_at: String,
}
