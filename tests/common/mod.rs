#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use tradeblocks::domain::daily::MarketDailyRow;
use tradeblocks::domain::error::TradeblocksError;
use tradeblocks::domain::intraday::IntradayRow;
use tradeblocks::domain::trade::Trade;
use tradeblocks::ports::market_port::MarketDataPort;

pub struct MockMarketPort {
    pub daily: Vec<MarketDailyRow>,
    pub intraday: Vec<IntradayRow>,
    pub vix_intraday: Vec<IntradayRow>,
}

impl MockMarketPort {
    pub fn new() -> Self {
        Self {
            daily: Vec::new(),
            intraday: Vec::new(),
            vix_intraday: Vec::new(),
        }
    }

    pub fn with_daily(mut self, rows: Vec<MarketDailyRow>) -> Self {
        self.daily.extend(rows);
        self
    }

    pub fn with_intraday(mut self, rows: Vec<IntradayRow>) -> Self {
        self.intraday.extend(rows);
        self
    }

    pub fn with_vix_intraday(mut self, rows: Vec<IntradayRow>) -> Self {
        self.vix_intraday.extend(rows);
        self
    }
}

impl MarketDataPort for MockMarketPort {
    fn fetch_daily_history(&self, ticker: &str) -> Result<Vec<MarketDailyRow>, TradeblocksError> {
        Ok(self
            .daily
            .iter()
            .filter(|r| r.ticker == ticker)
            .cloned()
            .collect())
    }

    fn fetch_intraday(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IntradayRow>, TradeblocksError> {
        Ok(self
            .intraday
            .iter()
            .filter(|r| r.ticker == ticker && r.date >= start_date && r.date <= end_date)
            .cloned()
            .collect())
    }

    fn fetch_vix_intraday(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IntradayRow>, TradeblocksError> {
        Ok(self
            .vix_intraday
            .iter()
            .filter(|r| r.ticker == ticker && r.date >= start_date && r.date <= end_date)
            .cloned()
            .collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn make_trade(ticker: Option<&str>, opened: NaiveDate, entry: NaiveTime, pl: f64) -> Trade {
    Trade {
        date_opened: opened,
        time_opened: entry,
        strategy: "Iron Condor".to_string(),
        ticker: ticker.map(str::to_string),
        pl,
        num_contracts: 1,
        premium: 100.0,
        opening_commissions: 1.3,
        closing_commissions: 1.3,
        reason_for_close: None,
    }
}

pub fn daily_row(ticker: &str, d: NaiveDate) -> MarketDailyRow {
    MarketDailyRow::new(ticker, d)
}

pub fn intraday_row(ticker: &str, d: NaiveDate, prices: &[(usize, f64)]) -> IntradayRow {
    let mut row = IntradayRow::empty(ticker, d);
    for &(i, p) in prices {
        row.prices[i] = Some(p);
    }
    row
}
