//! Lookahead-free join of trade keys onto daily market context.
//!
//! CLOSE_DERIVED columns for day D are read from the most recent earlier
//! trading day with data for that ticker, found by scanning the ticker's full
//! chronology. A fixed calendar offset would land on weekends and holidays;
//! a batch-local scan would let the requested key set change the lag.

use crate::domain::daily::MarketDailyRow;
use crate::domain::error::TradeblocksError;
use crate::domain::market_key::TickerDateKey;
use crate::ports::market_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Full per-ticker chronology, sorted ascending by date.
#[derive(Debug, Clone)]
pub struct TickerHistory {
    rows: Vec<MarketDailyRow>,
}

impl TickerHistory {
    pub fn new(mut rows: Vec<MarketDailyRow>) -> Self {
        rows.sort_by_key(|r| r.date);
        rows.dedup_by_key(|r| r.date);
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row recorded on exactly `date`.
    pub fn row_on(&self, date: NaiveDate) -> Option<&MarketDailyRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Row of the most recent trading day strictly before `date`. `None` on
    /// the first day of the ticker's history; never interpolated.
    pub fn prior_row(&self, date: NaiveDate) -> Option<&MarketDailyRow> {
        let idx = self.rows.partition_point(|r| r.date < date);
        idx.checked_sub(1).map(|i| &self.rows[i])
    }
}

/// Same-day row paired with its lagged prior-trading-day row.
///
/// The prior row is the only legitimate source of CLOSE_DERIVED values at
/// entry time. Same-day CLOSE_DERIVED values are exposed separately through
/// [`LagJoin::outcome_row`] so the two cannot be mixed by accident.
#[derive(Debug, Clone)]
pub struct DailyContext {
    pub same_day: MarketDailyRow,
    pub prior_day: Option<MarketDailyRow>,
}

/// Resolves ticker-date keys against full per-ticker histories.
pub struct LagJoin {
    histories: HashMap<String, TickerHistory>,
}

impl LagJoin {
    /// Fetch the full history of every distinct ticker once.
    pub fn build(
        market: &dyn MarketDataPort,
        tickers: &BTreeSet<String>,
    ) -> Result<Self, TradeblocksError> {
        let mut histories = HashMap::new();
        for ticker in tickers {
            let rows = market.fetch_daily_history(ticker)?;
            histories.insert(ticker.clone(), TickerHistory::new(rows));
        }
        Ok(Self { histories })
    }

    pub fn from_histories(histories: HashMap<String, TickerHistory>) -> Self {
        Self { histories }
    }

    /// Entry-safe context for a key: the same-day row plus the lagged prior
    /// row. `None` when the key has no same-day record at all.
    pub fn resolve(&self, key: &TickerDateKey) -> Option<DailyContext> {
        let history = self.histories.get(&key.ticker)?;
        let same_day = history.row_on(key.date)?.clone();
        let prior_day = history.prior_row(key.date).cloned();
        Some(DailyContext {
            same_day,
            prior_day,
        })
    }

    /// Same-day row for post-hoc outcome analysis. Its CLOSE_DERIVED values
    /// were not knowable at entry.
    pub fn outcome_row(&self, key: &TickerDateKey) -> Option<&MarketDailyRow> {
        self.histories.get(&key.ticker)?.row_on(key.date)
    }
}
