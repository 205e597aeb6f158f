//! Filtering, sorting and summarizing aggregated listings.
//!
//! Prices are read leniently: the API sends them as numbers, numeric
//! strings, `null`, or not at all, and anything that is not a finite number
//! counts as 0. Every function here is total.

use serde_json::Value;

use crate::types::Record;

/// Condition filter on the listing's `state` field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Condition {
    #[default]
    Any,
    /// Case-insensitive match, e.g. `new` or `used`.
    Is(String),
}

impl Condition {
    /// `"all"` and `"any"` (any case) mean no filtering.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("any") {
            Condition::Any
        } else {
            Condition::Is(s.to_string())
        }
    }

    fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::Any => true,
            Condition::Is(wanted) => {
                let state = record.get("state").and_then(Value::as_str).unwrap_or("");
                state.to_lowercase() == wanted.to_lowercase()
            }
        }
    }
}

/// Inclusive price bounds plus a condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub condition: Condition,
}

impl ListingFilter {
    pub fn matches(&self, record: &Record) -> bool {
        let price = price_of(record);
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }
        self.condition.matches(record)
    }

    /// Records passing the filter, in their original order.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceOrder {
    #[default]
    Unsorted,
    Ascending,
    Descending,
}

/// Stable sort by lenient price.
pub fn sort_by_price(records: &mut [Record], order: PriceOrder) {
    let cmp = |a: &Record, b: &Record| price_of(a).total_cmp(&price_of(b));
    match order {
        PriceOrder::Unsorted => {}
        PriceOrder::Ascending => records.sort_by(cmp),
        PriceOrder::Descending => records.sort_by(|a, b| cmp(b, a)),
    }
}

/// Numeric price of a record; 0 when missing or unparsable.
pub fn price_of(record: &Record) -> f64 {
    let price = match record.get("price") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    price.filter(|p| p.is_finite()).unwrap_or(0.0)
}

/// Descriptive statistics over the strictly positive prices of a result set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// `None` when no record has a positive price.
pub fn price_summary(records: &[Record]) -> Option<PriceSummary> {
    let prices: Vec<f64> = records.iter().map(price_of).filter(|p| *p > 0.0).collect();
    if prices.is_empty() {
        return None;
    }
    let min = prices.iter().copied().min_by(f64::total_cmp)?;
    let max = prices.iter().copied().max_by(f64::total_cmp)?;
    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    Some(PriceSummary {
        count: prices.len(),
        min,
        max,
        mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn listings() -> Vec<Record> {
        vec![
            record(json!({"id": 1, "price": 300, "state": "used"})),
            record(json!({"id": 2, "price": "150.5", "state": "NEW"})),
            record(json!({"id": 3, "price": "po dogovoru", "state": "used"})),
            record(json!({"id": 4, "state": "new"})),
            record(json!({"id": 5, "price": 150.5, "state": "Used"})),
            record(json!({"id": 6, "price": null})),
        ]
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn price_parsing_is_lenient() {
        let all = listings();
        let prices: Vec<f64> = all.iter().map(price_of).collect();
        assert_eq!(prices, [300.0, 150.5, 0.0, 0.0, 150.5, 0.0]);
    }

    #[test]
    fn filter_by_price_range_is_inclusive() {
        let filter = ListingFilter {
            min_price: Some(150.5),
            max_price: Some(300.0),
            ..ListingFilter::default()
        };
        assert_eq!(ids(&filter.apply(&listings())), [1, 2, 5]);
    }

    #[test]
    fn unparsable_prices_count_as_zero() {
        let filter = ListingFilter {
            max_price: Some(0.0),
            ..ListingFilter::default()
        };
        assert_eq!(ids(&filter.apply(&listings())), [3, 4, 6]);
    }

    #[test]
    fn condition_matches_case_insensitively() {
        let filter = ListingFilter {
            condition: Condition::parse("New"),
            ..ListingFilter::default()
        };
        assert_eq!(ids(&filter.apply(&listings())), [2, 4]);
        assert_eq!(Condition::parse("All"), Condition::Any);
    }

    #[test]
    fn filtering_is_idempotent() {
        let filter = ListingFilter {
            min_price: Some(100.0),
            max_price: None,
            condition: Condition::parse("used"),
        };
        let once = filter.apply(&listings());
        assert_eq!(filter.apply(&once), once);
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let mut asc = listings();
        sort_by_price(&mut asc, PriceOrder::Ascending);
        assert_eq!(ids(&asc), [3, 4, 6, 2, 5, 1]);
        let again = {
            let mut copy = asc.clone();
            sort_by_price(&mut copy, PriceOrder::Ascending);
            copy
        };
        assert_eq!(again, asc);

        let mut desc = listings();
        sort_by_price(&mut desc, PriceOrder::Descending);
        assert_eq!(ids(&desc), [1, 2, 5, 3, 4, 6]);
    }

    #[test]
    fn unsorted_keeps_order() {
        let mut records = listings();
        sort_by_price(&mut records, PriceOrder::Unsorted);
        assert_eq!(records, listings());
    }

    #[test]
    fn summary_ignores_non_positive_prices() {
        let summary = price_summary(&listings()).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 150.5);
        assert_eq!(summary.max, 300.0);
        assert!((summary.mean - 200.333).abs() < 0.001);
        assert!(price_summary(&listings()[2..4]).is_none());
    }
}
