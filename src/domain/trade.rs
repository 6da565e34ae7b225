//! Trade record as produced by the trade loader.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// A closed options trade. Owned by the trade loader; read-only to this crate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub date_opened: NaiveDate,
    pub time_opened: NaiveTime,
    pub strategy: String,
    /// Underlying symbol; absent trades resolve to the configured default.
    pub ticker: Option<String>,
    pub pl: f64,
    pub num_contracts: i64,
    pub premium: f64,
    pub opening_commissions: f64,
    pub closing_commissions: f64,
    pub reason_for_close: Option<String>,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pl > 0.0
    }
}

/// Filter a trade list by strategy name and opened-date range.
pub fn filter_trades(
    trades: &[Trade],
    strategy: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Vec<Trade> {
    trades
        .iter()
        .filter(|t| strategy.is_none_or(|s| t.strategy == s))
        .filter(|t| start_date.is_none_or(|d| t.date_opened >= d))
        .filter(|t| end_date.is_none_or(|d| t.date_opened <= d))
        .cloned()
        .collect()
}
