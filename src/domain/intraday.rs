//! Intraday checkpoint series and the entry-time context filter.
//!
//! Checkpoints are fixed 15-minute snapshots from 09:30 to 16:00. A trade's
//! entry context may contain only checkpoints at or before its entry time;
//! anything later is an outcome view and lives behind a separate constructor.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// Canonical checkpoint labels in ascending clock order.
pub const CHECKPOINT_LABELS: [&str; 27] = [
    "09:30", "09:45", "10:00", "10:15", "10:30", "10:45", "11:00", "11:15", "11:30", "11:45",
    "12:00", "12:15", "12:30", "12:45", "13:00", "13:15", "13:30", "13:45", "14:00", "14:15",
    "14:30", "14:45", "15:00", "15:15", "15:30", "15:45", "16:00",
];

/// Index of a label in the canonical ordering, `None` if unrecognized.
pub fn checkpoint_index(label: &str) -> Option<usize> {
    CHECKPOINT_LABELS.iter().position(|&l| l == label.trim())
}

/// Clock time of the checkpoint at `index`. Panics on an index outside the
/// canonical label set.
pub fn checkpoint_time(index: usize) -> NaiveTime {
    assert!(
        index < CHECKPOINT_LABELS.len(),
        "checkpoint index {index} out of range"
    );
    let minutes = (9 * 60 + 30 + 15 * index) as u32;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        .expect("checkpoint index within trading day")
}

/// One day of checkpoint prices for a ticker. `prices[i]` pairs with
/// `CHECKPOINT_LABELS[i]`; missing snapshots are `None`.
#[derive(Debug, Clone)]
pub struct IntradayRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub prices: Vec<Option<f64>>,
}

impl IntradayRow {
    pub fn empty(ticker: &str, date: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_string(),
            date,
            prices: vec![None; CHECKPOINT_LABELS.len()],
        }
    }

    /// Price at checkpoint `index`, treating non-positive values as missing.
    pub fn usable_price(&self, index: usize) -> Option<f64> {
        self.prices
            .get(index)
            .copied()
            .flatten()
            .filter(|p| *p > 0.0)
    }

    /// Last usable checkpoint of the day, in label order.
    pub fn last_usable(&self) -> Option<(usize, f64)> {
        (0..CHECKPOINT_LABELS.len())
            .rev()
            .find_map(|i| self.usable_price(i).map(|p| (i, p)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub label: &'static str,
    pub price: f64,
}

/// Checkpoint view of one trade's day, for the underlying and the volatility
/// index. Entry views hold checkpoints at or before entry only.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradayContext {
    pub underlying: Vec<Checkpoint>,
    pub volatility: Vec<Checkpoint>,
}

impl IntradayContext {
    pub fn is_empty(&self) -> bool {
        self.underlying.is_empty() && self.volatility.is_empty()
    }
}

fn collect<F>(row: Option<&IntradayRow>, keep: F) -> Vec<Checkpoint>
where
    F: Fn(usize) -> bool,
{
    let Some(row) = row else {
        return Vec::new();
    };
    (0..CHECKPOINT_LABELS.len())
        .filter(|&i| keep(i))
        .filter_map(|i| {
            row.usable_price(i).map(|price| Checkpoint {
                label: CHECKPOINT_LABELS[i],
                price,
            })
        })
        .collect()
}

/// Checkpoints knowable at entry: label time <= entry time. The boundary is
/// inclusive, a trade entered exactly at a checkpoint may see it.
pub fn entry_context(
    entry_time: NaiveTime,
    underlying: Option<&IntradayRow>,
    volatility: Option<&IntradayRow>,
) -> IntradayContext {
    IntradayContext {
        underlying: collect(underlying, |i| checkpoint_time(i) <= entry_time),
        volatility: collect(volatility, |i| checkpoint_time(i) <= entry_time),
    }
}

/// Checkpoints strictly after entry. Opt-in only; these were not knowable
/// when the trade was opened.
pub fn outcome_context(
    entry_time: NaiveTime,
    underlying: Option<&IntradayRow>,
    volatility: Option<&IntradayRow>,
) -> IntradayContext {
    IntradayContext {
        underlying: collect(underlying, |i| checkpoint_time(i) > entry_time),
        volatility: collect(volatility, |i| checkpoint_time(i) > entry_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(prices: &[(usize, f64)]) -> IntradayRow {
        let mut row = IntradayRow::empty("SPX", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        for &(i, p) in prices {
            row.prices[i] = Some(p);
        }
        row
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn labels_are_ascending() {
        for w in CHECKPOINT_LABELS.windows(2) {
            let a = NaiveTime::parse_from_str(w[0], "%H:%M").unwrap();
            let b = NaiveTime::parse_from_str(w[1], "%H:%M").unwrap();
            assert!(a < b);
        }
    }

    #[test]
    fn checkpoint_index_known_and_unknown() {
        assert_eq!(checkpoint_index("09:30"), Some(0));
        assert_eq!(checkpoint_index("16:00"), Some(26));
        assert_eq!(checkpoint_index("09:31"), None);
    }

    #[test]
    fn checkpoint_time_matches_labels() {
        for (i, label) in CHECKPOINT_LABELS.iter().enumerate() {
            let expected = NaiveTime::parse_from_str(label, "%H:%M").unwrap();
            assert_eq!(checkpoint_time(i), expected);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn checkpoint_time_rejects_out_of_range_index() {
        checkpoint_time(CHECKPOINT_LABELS.len());
    }

    #[test]
    fn entry_context_inclusive_boundary() {
        let row = row_with(&[(0, 4700.0), (1, 4705.0), (2, 4710.0)]);
        let ctx = entry_context(time(9, 45), Some(&row), None);
        let labels: Vec<&str> = ctx.underlying.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["09:30", "09:45"]);
    }

    #[test]
    fn entry_context_excludes_later_checkpoints() {
        let row = row_with(&[(0, 4700.0), (10, 4720.0), (26, 4730.0)]);
        let ctx = entry_context(time(9, 35), Some(&row), None);
        assert_eq!(ctx.underlying.len(), 1);
        assert_eq!(ctx.underlying[0].label, "09:30");
    }

    #[test]
    fn outcome_context_is_strictly_after_entry() {
        let row = row_with(&[(0, 4700.0), (1, 4705.0), (2, 4710.0)]);
        let out = outcome_context(time(9, 45), Some(&row), None);
        let labels: Vec<&str> = out.underlying.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["10:00"]);
    }

    #[test]
    fn non_positive_prices_are_not_usable() {
        let row = row_with(&[(0, 0.0), (1, -1.0), (2, 4710.0)]);
        let ctx = entry_context(time(16, 0), Some(&row), None);
        assert_eq!(ctx.underlying.len(), 1);
        assert_eq!(ctx.underlying[0].label, "10:00");
    }

    #[test]
    fn last_usable_skips_missing_tail() {
        let row = row_with(&[(0, 4700.0), (5, 4712.0)]);
        assert_eq!(row.last_usable(), Some((5, 4712.0)));
        let empty = IntradayRow::empty("SPX", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(empty.last_usable(), None);
    }

    #[test]
    fn volatility_series_filters_independently() {
        let under = row_with(&[(0, 4700.0), (3, 4706.0)]);
        let mut vix = IntradayRow::empty("SPX", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        vix.prices[0] = Some(13.5);
        vix.prices[4] = Some(14.2);

        let ctx = entry_context(time(10, 15), Some(&under), Some(&vix));
        assert_eq!(ctx.underlying.len(), 2);
        assert_eq!(ctx.volatility.len(), 1);
        assert_eq!(ctx.volatility[0].price, 13.5);
    }
}
