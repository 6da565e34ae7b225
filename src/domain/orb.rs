//! Opening-range breakout statistics over intraday checkpoint series.

use crate::domain::error::TradeblocksError;
use crate::domain::intraday::{checkpoint_index, IntradayRow, CHECKPOINT_LABELS};
use crate::domain::market_key::{normalize_ticker, DEFAULT_TICKER};
use crate::ports::market_port::MarketDataPort;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrbDay {
    pub date: NaiveDate,
    pub range_high: f64,
    pub range_low: f64,
    pub range_width: f64,
    /// Width relative to the range low, in percent.
    pub range_width_pct: f64,
    pub close: f64,
    /// 0 at the range low, 1 at the high, extended proportionally outside.
    pub close_position_in_range: f64,
    /// "above", "below" or "within".
    pub close_vs_range: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrbResult {
    pub ticker: String,
    pub start_label: String,
    pub end_label: String,
    /// Per-day rows, paged by the caller's offset and limit.
    pub days: Vec<OrbDay>,
    /// Aggregates over the full untruncated day set.
    pub total_days: usize,
    pub days_above: usize,
    pub days_below: usize,
    pub days_within: usize,
    pub pct_above: f64,
    pub pct_below: f64,
    pub pct_within: f64,
}

impl OrbResult {
    pub fn summary(&self) -> String {
        format!(
            "ORB {} {}-{}: {} day(s), {:.1}% above / {:.1}% below / {:.1}% within",
            self.ticker,
            self.start_label,
            self.end_label,
            self.total_days,
            self.pct_above,
            self.pct_below,
            self.pct_within
        )
    }
}

fn validate_label(label: &str) -> Result<usize, TradeblocksError> {
    checkpoint_index(label).ok_or_else(|| TradeblocksError::Validation {
        reason: format!(
            "unknown checkpoint '{label}', valid: {}",
            CHECKPOINT_LABELS.join(", ")
        ),
    })
}

/// Range high/low between the start and end checkpoints, inclusive, and the
/// day's close classified against that range.
fn orb_day(row: &IntradayRow, start_idx: usize, end_idx: usize) -> Option<OrbDay> {
    let mut high: Option<f64> = None;
    let mut low: Option<f64> = None;
    for i in start_idx..=end_idx {
        if let Some(price) = row.usable_price(i) {
            high = Some(high.map_or(price, |h: f64| h.max(price)));
            low = Some(low.map_or(price, |l: f64| l.min(price)));
        }
    }
    // Days with no usable checkpoint in the window are skipped, not zeroed.
    let (high, low) = (high?, low?);
    let (_, close) = row.last_usable()?;

    let width = high - low;
    let (position, class) = if width == 0.0 {
        if close > high {
            (1.0, "above")
        } else if close < low {
            (0.0, "below")
        } else {
            (0.5, "within")
        }
    } else {
        let position = (close - low) / width;
        let class = if position > 1.0 {
            "above"
        } else if position < 0.0 {
            "below"
        } else {
            "within"
        };
        (position, class)
    };

    Some(OrbDay {
        date: row.date,
        range_high: high,
        range_low: low,
        range_width: width,
        range_width_pct: if low > 0.0 { width / low * 100.0 } else { 0.0 },
        close,
        close_position_in_range: position,
        close_vs_range: class.to_string(),
    })
}

/// Compute opening-range stats for a ticker over a date range. `offset` and
/// `limit` page the per-day list only; aggregates always cover every day.
#[allow(clippy::too_many_arguments)]
pub fn compute_orb(
    market: &dyn MarketDataPort,
    ticker: &str,
    start_label: &str,
    end_label: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    offset: Option<usize>,
    limit: Option<usize>,
) -> Result<OrbResult, TradeblocksError> {
    let start_idx = validate_label(start_label)?;
    let end_idx = validate_label(end_label)?;
    if start_idx >= end_idx {
        return Err(TradeblocksError::Validation {
            reason: format!(
                "range start '{}' must precede range end '{}'",
                CHECKPOINT_LABELS[start_idx], CHECKPOINT_LABELS[end_idx]
            ),
        });
    }

    let ticker = normalize_ticker(ticker, DEFAULT_TICKER);
    let rows = market.fetch_intraday(&ticker, start_date, end_date)?;

    let mut days: Vec<OrbDay> = rows
        .iter()
        .filter_map(|row| orb_day(row, start_idx, end_idx))
        .collect();
    days.sort_by_key(|d| d.date);

    let total_days = days.len();
    let days_above = days.iter().filter(|d| d.close_vs_range == "above").count();
    let days_below = days.iter().filter(|d| d.close_vs_range == "below").count();
    let days_within = total_days - days_above - days_below;
    let pct = |n: usize| {
        if total_days > 0 {
            n as f64 / total_days as f64 * 100.0
        } else {
            0.0
        }
    };
    let (pct_above, pct_below, pct_within) = (pct(days_above), pct(days_below), pct(days_within));

    let mut days: Vec<OrbDay> = days.into_iter().skip(offset.unwrap_or(0)).collect();
    if let Some(limit) = limit {
        days.truncate(limit);
    }

    Ok(OrbResult {
        ticker,
        start_label: CHECKPOINT_LABELS[start_idx].to_string(),
        end_label: CHECKPOINT_LABELS[end_idx].to_string(),
        days,
        total_days,
        days_above,
        days_below,
        days_within,
        pct_above,
        pct_below,
        pct_within,
    })
}
