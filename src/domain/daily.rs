//! Typed daily market-context row.
//!
//! One row of the `market_daily` table per (ticker, date). Optional fields
//! carry NULLs straight through: a missing value stays missing, it is never
//! substituted with zero or a neighboring day's value.

use crate::domain::field_timing::{FieldTiming, MarketField};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDailyRow {
    #[serde(skip)]
    pub ticker: String,
    #[serde(skip)]
    pub date: NaiveDate,

    // STATIC
    pub day_of_week: Option<i64>,
    pub month: Option<i64>,
    pub is_opex: Option<bool>,

    // OPEN_KNOWN
    pub open: Option<f64>,
    pub prior_close: Option<f64>,
    pub gap_pct: Option<f64>,
    pub vix_open: Option<f64>,
    pub vix_gap_pct: Option<f64>,
    pub prev_return_pct: Option<f64>,

    // CLOSE_DERIVED
    pub close: Option<f64>,
    pub total_return_pct: Option<f64>,
    pub intraday_return_pct: Option<f64>,
    pub close_position_in_range: Option<f64>,
    pub gap_filled: Option<bool>,
    pub vix_close: Option<f64>,
    pub vix_change_pct: Option<f64>,
    pub vix_percentile: Option<f64>,
    pub vol_regime: Option<i64>,
    pub vix9d_vix_ratio: Option<f64>,
    pub vix_vix3m_ratio: Option<f64>,
    pub term_structure_state: Option<i64>,
    pub rsi_14: Option<f64>,
    pub atr_pct: Option<f64>,
    pub trend_score: Option<i64>,
    pub bb_position: Option<f64>,
    pub return_5d: Option<f64>,
    pub consecutive_days: Option<i64>,
}

impl MarketDailyRow {
    pub fn new(ticker: &str, date: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_string(),
            date,
            ..Self::default()
        }
    }

    /// Read a registered field as a number. The single conversion boundary:
    /// integers widen to f64, flags map to 0/1, NULL stays `None`.
    pub fn value(&self, field: MarketField) -> Option<f64> {
        match field {
            MarketField::DayOfWeek => self.day_of_week.map(|v| v as f64),
            MarketField::Month => self.month.map(|v| v as f64),
            MarketField::IsOpex => self.is_opex.map(|v| if v { 1.0 } else { 0.0 }),
            MarketField::Open => self.open,
            MarketField::PriorClose => self.prior_close,
            MarketField::GapPct => self.gap_pct,
            MarketField::VixOpen => self.vix_open,
            MarketField::VixGapPct => self.vix_gap_pct,
            MarketField::PrevReturnPct => self.prev_return_pct,
            MarketField::Close => self.close,
            MarketField::TotalReturnPct => self.total_return_pct,
            MarketField::IntradayReturnPct => self.intraday_return_pct,
            MarketField::ClosePositionInRange => self.close_position_in_range,
            MarketField::GapFilled => self.gap_filled.map(|v| if v { 1.0 } else { 0.0 }),
            MarketField::VixClose => self.vix_close,
            MarketField::VixChangePct => self.vix_change_pct,
            MarketField::VixPercentile => self.vix_percentile,
            MarketField::VolRegime => self.vol_regime.map(|v| v as f64),
            MarketField::Vix9dVixRatio => self.vix9d_vix_ratio,
            MarketField::VixVix3mRatio => self.vix_vix3m_ratio,
            MarketField::TermStructureState => self.term_structure_state.map(|v| v as f64),
            MarketField::Rsi14 => self.rsi_14,
            MarketField::AtrPct => self.atr_pct,
            MarketField::TrendScore => self.trend_score.map(|v| v as f64),
            MarketField::BbPosition => self.bb_position,
            MarketField::Return5d => self.return_5d,
            MarketField::ConsecutiveDays => self.consecutive_days.map(|v| v as f64),
        }
    }

    /// Present fields of one timing class, keyed by exact column name.
    pub fn fields_with_timing(&self, timing: FieldTiming) -> BTreeMap<&'static str, f64> {
        MarketField::ALL
            .iter()
            .filter(|f| f.timing() == timing)
            .filter_map(|&f| self.value(f).map(|v| (f.name(), v)))
            .collect()
    }
}
