//! SQLite analytics-store adapter.
//!
//! Implements the trade loader and the market-data port against one pooled
//! database. Table and column names mirror the market-data feed exactly; the
//! row mappers here are the only place raw SQL values become domain types.

use crate::domain::daily::MarketDailyRow;
use crate::domain::error::TradeblocksError;
use crate::domain::intraday::{checkpoint_index, IntradayRow, CHECKPOINT_LABELS};
use crate::domain::trade::Trade;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_port::MarketDataPort;
use crate::ports::trade_port::TradePort;
use chrono::{NaiveDate, NaiveTime};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};
use std::collections::BTreeMap;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: impl std::fmt::Display) -> TradeblocksError {
    TradeblocksError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> TradeblocksError {
    TradeblocksError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn sql_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_sql_date(text: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            text.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn parse_sql_time(text: &str) -> Result<NaiveTime, rusqlite::Error> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                text.len(),
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradeblocksError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TradeblocksError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TradeblocksError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), TradeblocksError> {
        let conn = self.pool.get().map_err(db_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                block_id TEXT NOT NULL,
                date_opened TEXT NOT NULL,
                time_opened TEXT NOT NULL,
                strategy TEXT NOT NULL,
                ticker TEXT,
                pl REAL NOT NULL,
                num_contracts INTEGER NOT NULL,
                premium REAL NOT NULL,
                opening_commissions REAL NOT NULL,
                closing_commissions REAL NOT NULL,
                reason_for_close TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_trades_block ON trades(block_id);

            CREATE TABLE IF NOT EXISTS market_daily (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                Day_of_Week INTEGER,
                Month INTEGER,
                Is_Opex INTEGER,
                open REAL,
                Prior_Close REAL,
                Gap_Pct REAL,
                VIX_Open REAL,
                VIX_Gap_Pct REAL,
                Prev_Return_Pct REAL,
                close REAL,
                Total_Return_Pct REAL,
                Intraday_Return_Pct REAL,
                Close_Position_In_Range REAL,
                Gap_Filled INTEGER,
                VIX_Close REAL,
                VIX_Change_Pct REAL,
                VIX_Percentile REAL,
                Vol_Regime INTEGER,
                VIX9D_VIX_Ratio REAL,
                VIX_VIX3M_Ratio REAL,
                Term_Structure_State INTEGER,
                RSI_14 REAL,
                ATR_Pct REAL,
                Trend_Score INTEGER,
                BB_Position REAL,
                Return_5D REAL,
                Consecutive_Days INTEGER,
                PRIMARY KEY (ticker, date)
            );

            CREATE TABLE IF NOT EXISTS market_intraday (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                checkpoint TEXT NOT NULL,
                price REAL,
                PRIMARY KEY (ticker, date, checkpoint)
            );

            CREATE TABLE IF NOT EXISTS vix_intraday (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                checkpoint TEXT NOT NULL,
                price REAL,
                PRIMARY KEY (ticker, date, checkpoint)
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }

    pub fn insert_trades(
        &self,
        block_id: &str,
        trades: &[Trade],
    ) -> Result<(), TradeblocksError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;

        for trade in trades {
            tx.execute(
                "INSERT INTO trades (block_id, date_opened, time_opened, strategy, ticker,
                                     pl, num_contracts, premium, opening_commissions,
                                     closing_commissions, reason_for_close)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    block_id,
                    sql_date(trade.date_opened),
                    trade.time_opened.format("%H:%M:%S").to_string(),
                    trade.strategy,
                    trade.ticker,
                    trade.pl,
                    trade.num_contracts,
                    trade.premium,
                    trade.opening_commissions,
                    trade.closing_commissions,
                    trade.reason_for_close,
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    pub fn insert_daily_rows(&self, rows: &[MarketDailyRow]) -> Result<(), TradeblocksError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;

        for row in rows {
            tx.execute(
                "INSERT OR REPLACE INTO market_daily (
                    ticker, date, Day_of_Week, Month, Is_Opex,
                    open, Prior_Close, Gap_Pct, VIX_Open, VIX_Gap_Pct, Prev_Return_Pct,
                    close, Total_Return_Pct, Intraday_Return_Pct, Close_Position_In_Range,
                    Gap_Filled, VIX_Close, VIX_Change_Pct, VIX_Percentile, Vol_Regime,
                    VIX9D_VIX_Ratio, VIX_VIX3M_Ratio, Term_Structure_State,
                    RSI_14, ATR_Pct, Trend_Score, BB_Position, Return_5D, Consecutive_Days
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                           ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)",
                params![
                    row.ticker,
                    sql_date(row.date),
                    row.day_of_week,
                    row.month,
                    row.is_opex.map(i64::from),
                    row.open,
                    row.prior_close,
                    row.gap_pct,
                    row.vix_open,
                    row.vix_gap_pct,
                    row.prev_return_pct,
                    row.close,
                    row.total_return_pct,
                    row.intraday_return_pct,
                    row.close_position_in_range,
                    row.gap_filled.map(i64::from),
                    row.vix_close,
                    row.vix_change_pct,
                    row.vix_percentile,
                    row.vol_regime,
                    row.vix9d_vix_ratio,
                    row.vix_vix3m_ratio,
                    row.term_structure_state,
                    row.rsi_14,
                    row.atr_pct,
                    row.trend_score,
                    row.bb_position,
                    row.return_5d,
                    row.consecutive_days,
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    pub fn insert_intraday_rows(&self, rows: &[IntradayRow]) -> Result<(), TradeblocksError> {
        self.insert_checkpoints("market_intraday", rows)
    }

    pub fn insert_vix_intraday_rows(&self, rows: &[IntradayRow]) -> Result<(), TradeblocksError> {
        self.insert_checkpoints("vix_intraday", rows)
    }

    fn insert_checkpoints(
        &self,
        table: &str,
        rows: &[IntradayRow],
    ) -> Result<(), TradeblocksError> {
        let mut conn = self.pool.get().map_err(db_err)?;
        let tx = conn.transaction().map_err(query_err)?;

        let sql = format!(
            "INSERT OR REPLACE INTO {table} (ticker, date, checkpoint, price)
             VALUES (?1, ?2, ?3, ?4)"
        );
        for row in rows {
            for (i, price) in row.prices.iter().enumerate() {
                let Some(price) = price else { continue };
                tx.execute(
                    &sql,
                    params![row.ticker, sql_date(row.date), CHECKPOINT_LABELS[i], price],
                )
                .map_err(query_err)?;
            }
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn fetch_checkpoints(
        &self,
        table: &str,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IntradayRow>, TradeblocksError> {
        let conn = self.pool.get().map_err(db_err)?;

        let sql = format!(
            "SELECT date, checkpoint, price FROM {table}
             WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date, checkpoint"
        );
        let mut stmt = conn.prepare(&sql).map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![ticker, sql_date(start_date), sql_date(end_date)],
                |row| {
                    let date_str: String = row.get(0)?;
                    let label: String = row.get(1)?;
                    let price: Option<f64> = row.get(2)?;
                    Ok((parse_sql_date(&date_str)?, label, price))
                },
            )
            .map_err(query_err)?;

        let mut by_date: BTreeMap<NaiveDate, IntradayRow> = BTreeMap::new();
        for row in rows {
            let (date, label, price) = row.map_err(query_err)?;
            // Rows with labels outside the canonical set are ignored.
            let Some(index) = checkpoint_index(&label) else {
                continue;
            };
            by_date
                .entry(date)
                .or_insert_with(|| IntradayRow::empty(ticker, date))
                .prices[index] = price;
        }

        Ok(by_date.into_values().collect())
    }
}

fn daily_row_from_sql(row: &Row<'_>) -> Result<MarketDailyRow, rusqlite::Error> {
    let ticker: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    Ok(MarketDailyRow {
        ticker,
        date: parse_sql_date(&date_str)?,
        day_of_week: row.get(2)?,
        month: row.get(3)?,
        is_opex: row.get::<_, Option<i64>>(4)?.map(|v| v != 0),
        open: row.get(5)?,
        prior_close: row.get(6)?,
        gap_pct: row.get(7)?,
        vix_open: row.get(8)?,
        vix_gap_pct: row.get(9)?,
        prev_return_pct: row.get(10)?,
        close: row.get(11)?,
        total_return_pct: row.get(12)?,
        intraday_return_pct: row.get(13)?,
        close_position_in_range: row.get(14)?,
        gap_filled: row.get::<_, Option<i64>>(15)?.map(|v| v != 0),
        vix_close: row.get(16)?,
        vix_change_pct: row.get(17)?,
        vix_percentile: row.get(18)?,
        vol_regime: row.get(19)?,
        vix9d_vix_ratio: row.get(20)?,
        vix_vix3m_ratio: row.get(21)?,
        term_structure_state: row.get(22)?,
        rsi_14: row.get(23)?,
        atr_pct: row.get(24)?,
        trend_score: row.get(25)?,
        bb_position: row.get(26)?,
        return_5d: row.get(27)?,
        consecutive_days: row.get(28)?,
    })
}

impl TradePort for SqliteAdapter {
    fn load_trades(&self, block_id: &str) -> Result<Vec<Trade>, TradeblocksError> {
        let conn = self.pool.get().map_err(db_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT date_opened, time_opened, strategy, ticker, pl, num_contracts,
                        premium, opening_commissions, closing_commissions, reason_for_close
                 FROM trades WHERE block_id = ?1
                 ORDER BY date_opened, time_opened",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![block_id], |row| {
                let date_str: String = row.get(0)?;
                let time_str: String = row.get(1)?;
                Ok(Trade {
                    date_opened: parse_sql_date(&date_str)?,
                    time_opened: parse_sql_time(&time_str)?,
                    strategy: row.get(2)?,
                    ticker: row.get(3)?,
                    pl: row.get(4)?,
                    num_contracts: row.get(5)?,
                    premium: row.get(6)?,
                    opening_commissions: row.get(7)?,
                    closing_commissions: row.get(8)?,
                    reason_for_close: row.get(9)?,
                })
            })
            .map_err(query_err)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row.map_err(query_err)?);
        }

        if trades.is_empty() {
            return Err(TradeblocksError::BlockNotFound {
                block_id: block_id.to_string(),
            });
        }

        Ok(trades)
    }
}

impl MarketDataPort for SqliteAdapter {
    fn fetch_daily_history(&self, ticker: &str) -> Result<Vec<MarketDailyRow>, TradeblocksError> {
        let conn = self.pool.get().map_err(db_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT ticker, date, Day_of_Week, Month, Is_Opex,
                        open, Prior_Close, Gap_Pct, VIX_Open, VIX_Gap_Pct, Prev_Return_Pct,
                        close, Total_Return_Pct, Intraday_Return_Pct, Close_Position_In_Range,
                        Gap_Filled, VIX_Close, VIX_Change_Pct, VIX_Percentile, Vol_Regime,
                        VIX9D_VIX_Ratio, VIX_VIX3M_Ratio, Term_Structure_State,
                        RSI_14, ATR_Pct, Trend_Score, BB_Position, Return_5D, Consecutive_Days
                 FROM market_daily WHERE ticker = ?1
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![ticker], daily_row_from_sql)
            .map_err(query_err)?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row.map_err(query_err)?);
        }

        Ok(history)
    }

    fn fetch_intraday(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IntradayRow>, TradeblocksError> {
        self.fetch_checkpoints("market_intraday", ticker, start_date, end_date)
    }

    fn fetch_vix_intraday(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IntradayRow>, TradeblocksError> {
        self.fetch_checkpoints("vix_intraday", ticker, start_date, end_date)
    }
}
