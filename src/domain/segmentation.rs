//! Market-regime segmentation of enriched trades.
//!
//! Trades are grouped by one market dimension and compared against the
//! overall segmented population. CLOSE_DERIVED dimensions read the lagged
//! prior-day value; a trade whose required field is absent is counted as
//! lag-excluded, never silently folded into a segment.

use crate::domain::enrich::EnrichedTrade;
use crate::domain::error::TradeblocksError;
use crate::domain::field_timing::MarketField;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dead band for gap-direction bucketing, in percentage points.
const GAP_FLAT_BAND_PCT: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentDimension {
    VolRegime,
    TermStructure,
    DayOfWeek,
    GapDirection,
    TrendScore,
}

impl SegmentDimension {
    pub const ALL: [SegmentDimension; 5] = [
        SegmentDimension::VolRegime,
        SegmentDimension::TermStructure,
        SegmentDimension::DayOfWeek,
        SegmentDimension::GapDirection,
        SegmentDimension::TrendScore,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            SegmentDimension::VolRegime => "volRegime",
            SegmentDimension::TermStructure => "termStructure",
            SegmentDimension::DayOfWeek => "dayOfWeek",
            SegmentDimension::GapDirection => "gapDirection",
            SegmentDimension::TrendScore => "trendScore",
        }
    }

    pub fn parse(input: &str) -> Result<Self, TradeblocksError> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.wire_name().eq_ignore_ascii_case(input.trim()))
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|d| d.wire_name()).collect();
                TradeblocksError::Validation {
                    reason: format!(
                        "unknown segment dimension '{input}', valid: {}",
                        valid.join(", ")
                    ),
                }
            })
    }

    fn field(self) -> MarketField {
        match self {
            SegmentDimension::VolRegime => MarketField::VolRegime,
            SegmentDimension::TermStructure => MarketField::TermStructureState,
            SegmentDimension::DayOfWeek => MarketField::DayOfWeek,
            SegmentDimension::GapDirection => MarketField::GapPct,
            SegmentDimension::TrendScore => MarketField::TrendScore,
        }
    }

    /// Segment value and human label for one trade, `None` when the required
    /// field is absent (insufficient lag history or a NULL source value).
    fn segment_of(self, trade: &EnrichedTrade) -> Option<(f64, String)> {
        let raw = trade.entry_value(self.field())?;
        Some(match self {
            SegmentDimension::VolRegime => (raw, vol_regime_label(raw)),
            SegmentDimension::TermStructure => (raw, term_structure_label(raw)),
            SegmentDimension::DayOfWeek => (raw, day_of_week_label(raw)),
            SegmentDimension::GapDirection => gap_direction_bucket(raw),
            SegmentDimension::TrendScore => (raw, format!("Trend {raw:+.0}")),
        })
    }
}

fn vol_regime_label(value: f64) -> String {
    match value as i64 {
        1 => "Very Low (VIX < 12)".to_string(),
        2 => "Low (VIX 12-15)".to_string(),
        3 => "Normal (VIX 15-20)".to_string(),
        4 => "Elevated (VIX 20-25)".to_string(),
        5 => "High (VIX 25-35)".to_string(),
        6 => "Extreme (VIX > 35)".to_string(),
        other => format!("Regime {other}"),
    }
}

fn term_structure_label(value: f64) -> String {
    match value as i64 {
        -1 => "Backwardation".to_string(),
        0 => "Flat".to_string(),
        1 => "Contango".to_string(),
        other => format!("State {other}"),
    }
}

fn day_of_week_label(value: f64) -> String {
    match value as i64 {
        2 => "Monday".to_string(),
        3 => "Tuesday".to_string(),
        4 => "Wednesday".to_string(),
        5 => "Thursday".to_string(),
        6 => "Friday".to_string(),
        other => format!("Day {other}"),
    }
}

fn gap_direction_bucket(gap_pct: f64) -> (f64, String) {
    if gap_pct > GAP_FLAT_BAND_PCT {
        (1.0, "Gap Up".to_string())
    } else if gap_pct < -GAP_FLAT_BAND_PCT {
        (-1.0, "Gap Down".to_string())
    } else {
        (0.0, "Flat Open".to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStats {
    pub segment_label: String,
    pub segment_value: f64,
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percent, 0..100.
    pub win_rate: f64,
    pub total_pl: f64,
    pub avg_pl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Gross wins / gross losses. `None` with no wins and no losses; the raw
    /// gross-wins value when losses are zero but wins are positive.
    pub profit_factor: Option<f64>,
    pub delta_vs_overall_win_rate: f64,
    pub delta_vs_overall_avg_pl: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationResult {
    pub dimension: String,
    pub total_trades: usize,
    pub segmented: usize,
    pub lag_excluded: usize,
    pub unmatched: usize,
    pub overall_win_rate: f64,
    pub overall_avg_pl: f64,
    pub segments: Vec<SegmentStats>,
}

impl SegmentationResult {
    pub fn summary(&self) -> String {
        format!(
            "Segmented {} trades by {}: {} segment(s), {} segmented, {} lag-excluded, {} unmatched",
            self.total_trades,
            self.dimension,
            self.segments.len(),
            self.segmented,
            self.lag_excluded,
            self.unmatched
        )
    }
}

struct PlTally {
    count: usize,
    wins: usize,
    losses: usize,
    total_pl: f64,
    gross_wins: f64,
    gross_losses: f64,
}

impl PlTally {
    fn of<'a, I: IntoIterator<Item = &'a EnrichedTrade>>(trades: I) -> Self {
        let mut tally = PlTally {
            count: 0,
            wins: 0,
            losses: 0,
            total_pl: 0.0,
            gross_wins: 0.0,
            gross_losses: 0.0,
        };
        for trade in trades {
            tally.count += 1;
            tally.total_pl += trade.trade.pl;
            if trade.trade.pl > 0.0 {
                tally.wins += 1;
                tally.gross_wins += trade.trade.pl;
            } else if trade.trade.pl < 0.0 {
                tally.losses += 1;
                tally.gross_losses += trade.trade.pl.abs();
            }
        }
        tally
    }

    fn win_rate_pct(&self) -> f64 {
        if self.count > 0 {
            self.wins as f64 / self.count as f64 * 100.0
        } else {
            0.0
        }
    }

    fn avg_pl(&self) -> f64 {
        if self.count > 0 {
            self.total_pl / self.count as f64
        } else {
            0.0
        }
    }

    fn profit_factor(&self) -> Option<f64> {
        if self.gross_losses > 0.0 {
            Some(self.gross_wins / self.gross_losses)
        } else if self.gross_wins > 0.0 {
            Some(self.gross_wins)
        } else {
            None
        }
    }
}

/// Group enriched trades by `dimension` and compute comparative stats.
///
/// Invariant: sum of segment trade counts + lag_excluded + unmatched equals
/// the input trade count.
pub fn segment_trades(
    trades: &[EnrichedTrade],
    dimension: SegmentDimension,
) -> SegmentationResult {
    let mut unmatched = 0usize;
    let mut lag_excluded = 0usize;
    // Keyed by value in milli-units: segment values are small and discrete,
    // and f64 is not Ord.
    let mut groups: BTreeMap<i64, (f64, String, Vec<&EnrichedTrade>)> = BTreeMap::new();

    for trade in trades {
        if !trade.is_matched() {
            unmatched += 1;
            continue;
        }
        match dimension.segment_of(trade) {
            Some((value, label)) => {
                let key = (value * 1000.0).round() as i64;
                groups
                    .entry(key)
                    .or_insert_with(|| (value, label, Vec::new()))
                    .2
                    .push(trade);
            }
            None => lag_excluded += 1,
        }
    }

    let segmented: Vec<&EnrichedTrade> = groups
        .values()
        .flat_map(|(_, _, members)| members.iter().copied())
        .collect();
    let overall = PlTally::of(segmented.iter().copied());
    let overall_win_rate = overall.win_rate_pct();
    let overall_avg_pl = overall.avg_pl();

    let segments = groups
        .into_values()
        .map(|(value, label, members)| {
            let tally = PlTally::of(members.iter().copied());
            SegmentStats {
                segment_label: label,
                segment_value: value,
                trade_count: tally.count,
                wins: tally.wins,
                losses: tally.losses,
                win_rate: tally.win_rate_pct(),
                total_pl: tally.total_pl,
                avg_pl: tally.avg_pl(),
                avg_win: if tally.wins > 0 {
                    tally.gross_wins / tally.wins as f64
                } else {
                    0.0
                },
                avg_loss: if tally.losses > 0 {
                    tally.gross_losses / tally.losses as f64
                } else {
                    0.0
                },
                profit_factor: tally.profit_factor(),
                delta_vs_overall_win_rate: tally.win_rate_pct() - overall_win_rate,
                delta_vs_overall_avg_pl: tally.avg_pl() - overall_avg_pl,
            }
        })
        .collect();

    SegmentationResult {
        dimension: dimension.wire_name().to_string(),
        total_trades: trades.len(),
        segmented: overall.count,
        lag_excluded,
        unmatched,
        overall_win_rate,
        overall_avg_pl,
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enrich::EntryContext;
    use crate::domain::trade::Trade;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::BTreeMap as Map;

    fn base_trade(pl: f64) -> Trade {
        Trade {
            date_opened: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            time_opened: NaiveTime::from_hms_opt(9, 35, 0).unwrap(),
            strategy: "Test".to_string(),
            ticker: Some("SPX".to_string()),
            pl,
            num_contracts: 1,
            premium: 100.0,
            opening_commissions: 1.0,
            closing_commissions: 1.0,
            reason_for_close: None,
        }
    }

    fn enriched(
        pl: f64,
        same_day: &[(&'static str, f64)],
        prior_day: Option<&[(&'static str, f64)]>,
    ) -> EnrichedTrade {
        EnrichedTrade {
            trade: base_trade(pl),
            entry_context: Some(EntryContext {
                same_day: same_day.iter().copied().collect::<Map<_, _>>(),
                prior_day: prior_day.map(|p| p.iter().copied().collect::<Map<_, _>>()),
            }),
            outcome_fields: None,
            intraday_context: None,
            intraday_outcome: None,
        }
    }

    fn unmatched_trade(pl: f64) -> EnrichedTrade {
        EnrichedTrade {
            trade: base_trade(pl),
            entry_context: None,
            outcome_fields: None,
            intraday_context: None,
            intraday_outcome: None,
        }
    }

    #[test]
    fn parse_dimension_names() {
        assert_eq!(
            SegmentDimension::parse("volRegime").unwrap(),
            SegmentDimension::VolRegime
        );
        assert_eq!(
            SegmentDimension::parse("DAYOFWEEK").unwrap(),
            SegmentDimension::DayOfWeek
        );
        let err = SegmentDimension::parse("bogus").unwrap_err();
        assert!(err.to_string().contains("volRegime"));
        assert!(err.to_string().contains("trendScore"));
    }

    #[test]
    fn vol_regime_uses_lagged_value_and_named_bands() {
        let trades = vec![
            enriched(10.0, &[], Some(&[("Vol_Regime", 4.0)])),
            enriched(-5.0, &[], Some(&[("Vol_Regime", 4.0)])),
            enriched(20.0, &[], Some(&[("Vol_Regime", 2.0)])),
        ];
        let result = segment_trades(&trades, SegmentDimension::VolRegime);

        assert_eq!(result.segments.len(), 2);
        // Numeric ascending order.
        assert_eq!(result.segments[0].segment_value, 2.0);
        assert_eq!(result.segments[0].segment_label, "Low (VIX 12-15)");
        assert_eq!(result.segments[1].segment_label, "Elevated (VIX 20-25)");
        assert_eq!(result.segments[1].trade_count, 2);
    }

    #[test]
    fn lag_excluded_counted_separately_from_unmatched() {
        let trades = vec![
            enriched(10.0, &[], Some(&[("Vol_Regime", 3.0)])),
            // Matched but no prior-day history: lag-excluded.
            enriched(5.0, &[], None),
            // Matched, prior day exists, field itself NULL: lag-excluded.
            enriched(-5.0, &[], Some(&[("RSI_14", 50.0)])),
            unmatched_trade(7.0),
        ];
        let result = segment_trades(&trades, SegmentDimension::VolRegime);

        assert_eq!(result.total_trades, 4);
        assert_eq!(result.segmented, 1);
        assert_eq!(result.lag_excluded, 2);
        assert_eq!(result.unmatched, 1);
        let segment_total: usize = result.segments.iter().map(|s| s.trade_count).sum();
        assert_eq!(
            segment_total + result.lag_excluded + result.unmatched,
            result.total_trades
        );
    }

    #[test]
    fn day_of_week_labels() {
        let trades = vec![
            enriched(10.0, &[("Day_of_Week", 3.0)], None),
            enriched(-5.0, &[("Day_of_Week", 6.0)], None),
        ];
        let result = segment_trades(&trades, SegmentDimension::DayOfWeek);
        assert_eq!(result.segments[0].segment_label, "Tuesday");
        assert_eq!(result.segments[1].segment_label, "Friday");
        // STATIC dimension needs no prior-day history.
        assert_eq!(result.lag_excluded, 0);
    }

    #[test]
    fn term_structure_labels() {
        let trades = vec![
            enriched(10.0, &[], Some(&[("Term_Structure_State", -1.0)])),
            enriched(5.0, &[], Some(&[("Term_Structure_State", 0.0)])),
            enriched(-5.0, &[], Some(&[("Term_Structure_State", 1.0)])),
        ];
        let result = segment_trades(&trades, SegmentDimension::TermStructure);
        let labels: Vec<&str> = result
            .segments
            .iter()
            .map(|s| s.segment_label.as_str())
            .collect();
        assert_eq!(labels, vec!["Backwardation", "Flat", "Contango"]);
    }

    #[test]
    fn gap_direction_buckets_with_dead_band() {
        let trades = vec![
            enriched(10.0, &[("Gap_Pct", 0.5)], None),
            enriched(-5.0, &[("Gap_Pct", 0.05)], None),
            enriched(2.0, &[("Gap_Pct", -0.05)], None),
            enriched(-8.0, &[("Gap_Pct", -0.6)], None),
        ];
        let result = segment_trades(&trades, SegmentDimension::GapDirection);
        let labels: Vec<&str> = result
            .segments
            .iter()
            .map(|s| s.segment_label.as_str())
            .collect();
        assert_eq!(labels, vec!["Gap Down", "Flat Open", "Gap Up"]);
        assert_eq!(result.segments[1].trade_count, 2);
    }

    #[test]
    fn profit_factor_convention() {
        // Only winners: profit factor is the gross-wins value, not infinity.
        let winners = vec![
            enriched(30.0, &[("Day_of_Week", 3.0)], None),
            enriched(20.0, &[("Day_of_Week", 3.0)], None),
        ];
        let result = segment_trades(&winners, SegmentDimension::DayOfWeek);
        assert_eq!(result.segments[0].profit_factor, Some(50.0));

        // All break-even: no gross wins, no gross losses.
        let flat = vec![enriched(0.0, &[("Day_of_Week", 3.0)], None)];
        let result = segment_trades(&flat, SegmentDimension::DayOfWeek);
        assert_eq!(result.segments[0].profit_factor, None);
    }

    #[test]
    fn deltas_compare_against_segmented_population() {
        let trades = vec![
            enriched(100.0, &[("Day_of_Week", 3.0)], None),
            enriched(-50.0, &[("Day_of_Week", 5.0)], None),
        ];
        let result = segment_trades(&trades, SegmentDimension::DayOfWeek);
        assert!((result.overall_win_rate - 50.0).abs() < 1e-9);
        assert!((result.segments[0].delta_vs_overall_win_rate - 50.0).abs() < 1e-9);
        assert!((result.segments[1].delta_vs_overall_win_rate - (-50.0)).abs() < 1e-9);
    }
}
