use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};

use crate::model::{RateRecord, RawResponse, parse_rate};

pub const DEFAULT_BASE: &str = "USD";

/// Reshapes the payload into rows stamped with the current instant.
pub fn transform(raw: RawResponse) -> Vec<RateRecord> {
    transform_at(raw, Utc::now())
}

/// Every row shares `base`, `date` and the single `loaded_at` instant. Rows
/// without a rate are dropped, as are rates `Decimal` cannot hold (with a
/// warning). The rest are ordered by rate, highest first; equal rates keep
/// currency-code order.
pub fn transform_at(raw: RawResponse, loaded_at: DateTime<Utc>) -> Vec<RateRecord> {
    info!("Starting data transformation.");

    let base_currency = raw.base.unwrap_or_else(|| DEFAULT_BASE.to_string());
    let loaded_at = loaded_at.to_rfc3339_opts(SecondsFormat::Micros, false);

    let mut rows: Vec<RateRecord> = raw
        .rates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(currency, rate)| {
            let rate = match parse_rate(&rate?) {
                Ok(rate) => rate,
                Err(e) => {
                    warn!("Dropping {currency}: rate cannot be represented ({e}).");
                    return None;
                }
            };
            Some(RateRecord {
                currency,
                rate,
                base_currency: base_currency.clone(),
                date: raw.date.clone(),
                loaded_at: loaded_at.clone(),
            })
        })
        .collect();

    rows.sort_by(|a, b| b.rate.cmp(&a.rate));

    info!("Data transformation completed: {} rows.", rows.len());
    rows
}

/// Renders the first `limit` rows as an aligned text table for the log.
pub fn preview(rows: &[RateRecord], limit: usize) -> String {
    let mut out = format!(
        "{:<8} {:>14} {:<6} {:<10} {}",
        "currency", "rate", "base", "date", "loaded_at"
    );
    for row in rows.iter().take(limit) {
        out.push('\n');
        out.push_str(&format!(
            "{:<8} {:>14} {:<6} {:<10} {}",
            row.currency,
            row.rate.to_string(),
            row.base_currency,
            row.date.as_deref().unwrap_or("-"),
            row.loaded_at
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::Number;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn drops_null_rates_and_sorts_descending() {
        let raw: RawResponse = serde_json::from_str(
            r#"{"base":"USD","date":"2024-01-01","rates":{"EUR":0.9,"JPY":150.0,"GBP":null}}"#,
        )
        .unwrap();

        let rows = transform_at(raw, instant());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].currency, "JPY");
        assert_eq!(rows[0].rate, dec("150"));
        assert_eq!(rows[1].currency, "EUR");
        assert_eq!(rows[1].rate, dec("0.9"));
        for row in &rows {
            assert_eq!(row.base_currency, "USD");
            assert_eq!(row.date.as_deref(), Some("2024-01-01"));
            assert_eq!(row.loaded_at, "2024-01-01T08:30:00.000000+00:00");
        }
    }

    #[test]
    fn missing_rates_yield_no_rows() {
        let rows = transform_at(RawResponse::default(), instant());
        assert!(rows.is_empty());
    }

    #[test]
    fn base_defaults_to_usd_and_date_stays_absent() {
        let raw: RawResponse = serde_json::from_str(r#"{"rates":{"CHF":0.85}}"#).unwrap();
        let rows = transform_at(raw, instant());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].base_currency, DEFAULT_BASE);
        assert_eq!(rows[0].date, None);
    }

    #[test]
    fn equal_rates_keep_currency_order() {
        let raw: RawResponse =
            serde_json::from_str(r#"{"base":"EUR","rates":{"DKK":7.46,"BGN":1.95,"AAA":7.46}}"#)
                .unwrap();
        let rows = transform_at(raw, instant());

        let order: Vec<&str> = rows.iter().map(|r| r.currency.as_str()).collect();
        assert_eq!(order, ["AAA", "DKK", "BGN"]);
    }

    #[test]
    fn unrepresentable_rates_are_dropped_not_zeroed() {
        let raw: RawResponse = serde_json::from_str(
            r#"{"rates":{"BIG":1e30,"TINY":1e-30,"ODD":1.2345e-29,"EUR":0.9,"SMALL":2.5e-7}}"#,
        )
        .unwrap();
        let rows = transform_at(raw, instant());

        let kept: Vec<(&str, Decimal)> = rows.iter().map(|r| (r.currency.as_str(), r.rate)).collect();
        assert_eq!(kept, [("EUR", dec("0.9")), ("SMALL", dec("0.00000025"))]);
        assert!(rows.iter().all(|r| !r.rate.is_zero()));
    }

    #[test]
    fn preview_is_limited() {
        let raw: RawResponse =
            serde_json::from_str(r#"{"rates":{"A":1,"B":2,"C":3,"D":4,"E":5,"F":6,"G":7}}"#)
                .unwrap();
        let rows = transform_at(raw, instant());
        let text = preview(&rows, 5);

        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().nth(1).unwrap().starts_with("G "));
    }

    fn rates_strategy() -> impl Strategy<Value = BTreeMap<String, Option<Number>>> {
        prop::collection::btree_map(
            "[A-Z]{3}",
            prop::option::of(
                (1i64..10_000_000).prop_map(|n| Number::from_f64(n as f64 / 10_000.0).unwrap()),
            ),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn row_count_matches_non_null_rates(rates in rates_strategy()) {
            let expected = rates.values().filter(|r| r.is_some()).count();
            let raw = RawResponse { base: None, date: None, rates: Some(rates) };
            prop_assert_eq!(transform_at(raw, instant()).len(), expected);
        }

        #[test]
        fn rows_are_sorted_by_rate_descending(rates in rates_strategy()) {
            let raw = RawResponse { base: None, date: None, rates: Some(rates) };
            let rows = transform_at(raw, instant());
            for pair in rows.windows(2) {
                prop_assert!(pair[0].rate >= pair[1].rate);
            }
        }
    }
}
