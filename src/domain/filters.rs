//! Candidate entry-filter evaluation against historical trades.
//!
//! Each rule is an exclusion predicate over one market field. CLOSE_DERIVED
//! rules read the lagged prior-day value; trades with no defined value for a
//! rule's field drop out of that rule's evaluation pool rather than being
//! defaulted.

use crate::domain::enrich::EnrichedTrade;
use crate::domain::error::TradeblocksError;
use crate::domain::field_timing::MarketField;
use serde::Serialize;

/// Minimum trades matched to market data for any suggestion run.
pub const MIN_MATCHED_TRADES: usize = 10;
/// Minimum pool size for one rule's evaluation.
pub const MIN_POOL_TRADES: usize = 10;
/// Minimum trades left after removal for the projection to mean anything.
pub const MIN_REMAINING_TRADES: usize = 5;
/// Default win-rate improvement, in percentage points, for surfacing a rule.
pub const DEFAULT_MIN_IMPROVEMENT_PCT: f64 = 3.0;
/// Suggestions returned at most, after sorting by improvement.
pub const MAX_SUGGESTIONS: usize = 10;

pub struct FilterRule {
    pub description: &'static str,
    pub field_condition: &'static str,
    pub field: MarketField,
    pub exclude: fn(f64) -> bool,
}

/// Fixed catalog of candidate exclusion rules.
pub fn rule_catalog() -> Vec<FilterRule> {
    vec![
        FilterRule {
            description: "Skip entries after an overbought day",
            field_condition: "RSI_14 (prior day) > 70",
            field: MarketField::Rsi14,
            exclude: |v| v > 70.0,
        },
        FilterRule {
            description: "Skip entries after an oversold day",
            field_condition: "RSI_14 (prior day) < 30",
            field: MarketField::Rsi14,
            exclude: |v| v < 30.0,
        },
        FilterRule {
            description: "Skip high and extreme volatility regimes",
            field_condition: "Vol_Regime (prior day) >= 5",
            field: MarketField::VolRegime,
            exclude: |v| v >= 5.0,
        },
        FilterRule {
            description: "Skip when the vol term structure is inverted",
            field_condition: "Term_Structure_State (prior day) == -1",
            field: MarketField::TermStructureState,
            exclude: |v| v == -1.0,
        },
        FilterRule {
            description: "Skip strong downtrends",
            field_condition: "Trend_Score (prior day) <= -3",
            field: MarketField::TrendScore,
            exclude: |v| v <= -3.0,
        },
        FilterRule {
            description: "Skip when VIX is in its top decile",
            field_condition: "VIX_Percentile (prior day) > 90",
            field: MarketField::VixPercentile,
            exclude: |v| v > 90.0,
        },
        FilterRule {
            description: "Skip after a close in the bottom of the range",
            field_condition: "Close_Position_In_Range (prior day) < 0.2",
            field: MarketField::ClosePositionInRange,
            exclude: |v| v < 0.2,
        },
        FilterRule {
            description: "Skip large gap-down opens",
            field_condition: "Gap_Pct < -0.5",
            field: MarketField::GapPct,
            exclude: |v| v < -0.5,
        },
        FilterRule {
            description: "Skip large gap-up opens",
            field_condition: "Gap_Pct > 0.5",
            field: MarketField::GapPct,
            exclude: |v| v > 0.5,
        },
        FilterRule {
            description: "Skip Mondays",
            field_condition: "Day_of_Week == 2",
            field: MarketField::DayOfWeek,
            exclude: |v| v == 2.0,
        },
        FilterRule {
            description: "Skip Fridays",
            field_condition: "Day_of_Week == 6",
            field: MarketField::DayOfWeek,
            exclude: |v| v == 6.0,
        },
        FilterRule {
            description: "Skip options-expiration days",
            field_condition: "Is_Opex == 1",
            field: MarketField::IsOpex,
            exclude: |v| v == 1.0,
        },
    ]
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSuggestion {
    pub description: String,
    pub field_condition: String,
    pub trades_removed: usize,
    pub winners_removed: usize,
    pub losers_removed: usize,
    /// Percent, 0..100, over the remaining trades.
    pub projected_win_rate: f64,
    pub projected_total_pl: f64,
    /// Percentage points: projected minus pool win rate.
    pub win_rate_delta: f64,
    pub pl_delta: f64,
    pub confidence_tier: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAnalysis {
    pub matched_trades: usize,
    pub min_improvement_pct: f64,
    pub suggestions: Vec<FilterSuggestion>,
}

impl FilterAnalysis {
    pub fn summary(&self) -> String {
        format!(
            "Evaluated {} rules over {} matched trades: {} suggestion(s) at >= {:.1} pct-point improvement",
            rule_catalog().len(),
            self.matched_trades,
            self.suggestions.len(),
            self.min_improvement_pct
        )
    }
}

fn confidence_tier(removed: usize, remaining: usize) -> &'static str {
    if removed >= 10 && remaining >= 20 {
        "high"
    } else if removed >= 5 && remaining >= 10 {
        "medium"
    } else {
        "low"
    }
}

fn win_rate_pct(trades: &[&EnrichedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.trade.is_winner()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

fn total_pl(trades: &[&EnrichedTrade]) -> f64 {
    trades.iter().map(|t| t.trade.pl).sum()
}

/// Evaluate the rule catalog and report projected deltas for rules that clear
/// `min_improvement_pct`. Fails with `InsufficientData` below
/// [`MIN_MATCHED_TRADES`] matched trades.
pub fn suggest_filters(
    trades: &[EnrichedTrade],
    min_improvement_pct: f64,
) -> Result<FilterAnalysis, TradeblocksError> {
    let matched: Vec<&EnrichedTrade> = trades.iter().filter(|t| t.is_matched()).collect();
    if matched.len() < MIN_MATCHED_TRADES {
        return Err(TradeblocksError::InsufficientData {
            context: "filter suggestions".to_string(),
            have: matched.len(),
            minimum: MIN_MATCHED_TRADES,
        });
    }

    let mut suggestions = Vec::new();

    for rule in rule_catalog() {
        // Pool: trades with a defined value for the rule's field. For
        // CLOSE_DERIVED fields that is the lagged value, so trades without
        // lag history leave the pool here.
        let pool: Vec<(&EnrichedTrade, f64)> = matched
            .iter()
            .filter_map(|t| t.entry_value(rule.field).map(|v| (*t, v)))
            .collect();
        if pool.len() < MIN_POOL_TRADES {
            continue;
        }

        let (removed, remaining): (Vec<_>, Vec<_>) =
            pool.iter().partition(|(_, v)| (rule.exclude)(*v));
        if removed.is_empty() || remaining.len() < MIN_REMAINING_TRADES {
            continue;
        }

        let pool_trades: Vec<&EnrichedTrade> = pool.iter().map(|(t, _)| *t).collect();
        let remaining_trades: Vec<&EnrichedTrade> = remaining.iter().map(|(t, _)| *t).collect();
        let removed_trades: Vec<&EnrichedTrade> = removed.iter().map(|(t, _)| *t).collect();

        let pool_win_rate = win_rate_pct(&pool_trades);
        let projected_win_rate = win_rate_pct(&remaining_trades);
        let win_rate_delta = projected_win_rate - pool_win_rate;
        if win_rate_delta < min_improvement_pct {
            continue;
        }

        let winners_removed = removed_trades
            .iter()
            .filter(|t| t.trade.is_winner())
            .count();
        let projected_total_pl = total_pl(&remaining_trades);

        suggestions.push(FilterSuggestion {
            description: rule.description.to_string(),
            field_condition: rule.field_condition.to_string(),
            trades_removed: removed_trades.len(),
            winners_removed,
            losers_removed: removed_trades.len() - winners_removed,
            projected_win_rate,
            projected_total_pl,
            win_rate_delta,
            pl_delta: projected_total_pl - total_pl(&pool_trades),
            confidence_tier: confidence_tier(removed_trades.len(), remaining_trades.len())
                .to_string(),
        });
    }

    suggestions.sort_by(|a, b| {
        b.win_rate_delta
            .partial_cmp(&a.win_rate_delta)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.description.cmp(&b.description))
    });
    suggestions.truncate(MAX_SUGGESTIONS);

    Ok(FilterAnalysis {
        matched_trades: matched.len(),
        min_improvement_pct,
        suggestions,
    })
}
