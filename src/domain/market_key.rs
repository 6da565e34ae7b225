//! Ticker normalization and the (ticker, date) join key.

use crate::domain::error::TradeblocksError;
use crate::domain::trade::Trade;
use chrono::NaiveDate;

/// Pseudo-ticker for market-wide series (shared volatility-index feed).
pub const GLOBAL_TICKER: &str = "SPX";

/// Default underlying when a trade carries no ticker.
pub const DEFAULT_TICKER: &str = "SPX";

/// Alias to canonical symbol. Input is matched after trim + uppercase.
const TICKER_ALIASES: &[(&str, &str)] = &[
    ("SPX", "SPX"),
    ("SPXW", "SPX"),
    ("^SPX", "SPX"),
    ("$SPX", "SPX"),
    ("^GSPC", "SPX"),
    ("SPY", "SPY"),
    ("VIX", "VIX"),
    ("^VIX", "VIX"),
    ("$VIX", "VIX"),
    ("NDX", "NDX"),
    ("NDXP", "NDX"),
    ("^NDX", "NDX"),
    ("QQQ", "QQQ"),
    ("RUT", "RUT"),
    ("RUTW", "RUT"),
    ("^RUT", "RUT"),
    ("IWM", "IWM"),
    ("XSP", "XSP"),
];

/// Fold a raw ticker to its canonical symbol. Blank or unrecognized input
/// resolves to `default`.
pub fn normalize_ticker(input: &str, default: &str) -> String {
    let upper = input.trim().to_uppercase();
    if upper.is_empty() {
        return default.to_string();
    }
    for (alias, canonical) in TICKER_ALIASES {
        if upper == *alias {
            return (*canonical).to_string();
        }
    }
    default.to_string()
}

/// The trade's own ticker if present and normalizable, else `default`.
pub fn resolve_trade_ticker(trade: &Trade, default: &str) -> String {
    match trade.ticker.as_deref() {
        Some(t) => normalize_ticker(t, default),
        None => default.to_string(),
    }
}

/// Parse a calendar date by its literal components. No timezone is involved,
/// so `2024-01-02` can never shift to another day.
pub fn parse_date(input: &str) -> Result<NaiveDate, TradeblocksError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| TradeblocksError::Validation {
        reason: format!("invalid date '{input}' (expected YYYY-MM-DD)"),
    })
}

/// Normalized join key: which underlying, which calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickerDateKey {
    pub ticker: String,
    pub date: NaiveDate,
}

impl TickerDateKey {
    pub fn new(ticker: &str, date: NaiveDate, default: &str) -> Self {
        Self {
            ticker: normalize_ticker(ticker, default),
            date,
        }
    }

    pub fn for_trade(trade: &Trade, default: &str) -> Self {
        Self {
            ticker: resolve_trade_ticker(trade, default),
            date: trade.date_opened,
        }
    }

    /// Canonical composite form for map lookups and unmatched reporting.
    pub fn composite(&self) -> String {
        format!("{}|{}", self.ticker, self.date.format("%Y-%m-%d"))
    }
}
