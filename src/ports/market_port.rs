//! Market-data access port trait.

use crate::domain::daily::MarketDailyRow;
use crate::domain::error::TradeblocksError;
use crate::domain::intraday::IntradayRow;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Full daily history for one ticker, ascending by date. The prior
    /// trading-day lag is computed from this full ordering, so the result must
    /// never be trimmed to a requested batch of dates.
    fn fetch_daily_history(&self, ticker: &str) -> Result<Vec<MarketDailyRow>, TradeblocksError>;

    /// Underlying intraday checkpoint rows for a ticker over a date range.
    fn fetch_intraday(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IntradayRow>, TradeblocksError>;

    /// Volatility-index intraday checkpoint rows, keyed by underlying ticker.
    /// A market-wide feed is stored under the global pseudo-ticker.
    fn fetch_vix_intraday(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IntradayRow>, TradeblocksError>;
}
