//! CLI definition and dispatch.
//!
//! Every command loads an INI config, opens the analytics store, and prints a
//! JSON payload to stdout with progress and summary lines on stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::TradeblocksError;
use crate::domain::market_key::{parse_date, DEFAULT_TICKER};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "tradeblocks", about = "Lookahead-safe market context analytics for trade logs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Attach entry-time market context to a block of trades
    Enrich {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        block: String,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        /// Include same-day close-derived outcome fields
        #[arg(long)]
        include_outcome: bool,
        /// Include intraday checkpoints up to the entry time
        #[arg(long)]
        include_intraday: bool,
        /// Include intraday checkpoints after the entry time
        #[arg(long)]
        include_intraday_outcome: bool,
    },
    /// Segment block performance by a market regime dimension
    Segment {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        block: String,
        /// volRegime, termStructure, dayOfWeek, gapDirection or trendScore
        #[arg(short, long)]
        dimension: String,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
    },
    /// Suggest exclusion filters that would have improved the win rate
    SuggestFilters {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        block: String,
        /// Minimum win-rate improvement in percentage points
        #[arg(long)]
        min_improvement: Option<f64>,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
    },
    /// Opening-range breakout statistics over intraday checkpoints
    Orb {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticker: Option<String>,
        #[arg(long, default_value = "09:30")]
        range_start: String,
        #[arg(long, default_value = "10:00")]
        range_end: String,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
        /// Skip leading per-day rows (aggregates stay complete)
        #[arg(long)]
        offset: Option<usize>,
        /// Truncate the per-day listing (aggregates stay complete)
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Enrich {
            config,
            block,
            strategy,
            start_date,
            end_date,
            include_outcome,
            include_intraday,
            include_intraday_outcome,
        } => run_enrich(
            &config,
            &block,
            strategy.as_deref(),
            start_date.as_deref(),
            end_date.as_deref(),
            include_outcome,
            include_intraday,
            include_intraday_outcome,
        ),
        Command::Segment {
            config,
            block,
            dimension,
            strategy,
            start_date,
            end_date,
        } => run_segment(
            &config,
            &block,
            &dimension,
            strategy.as_deref(),
            start_date.as_deref(),
            end_date.as_deref(),
        ),
        Command::SuggestFilters {
            config,
            block,
            min_improvement,
            strategy,
            start_date,
            end_date,
        } => run_suggest_filters(
            &config,
            &block,
            min_improvement,
            strategy.as_deref(),
            start_date.as_deref(),
            end_date.as_deref(),
        ),
        Command::Orb {
            config,
            ticker,
            range_start,
            range_end,
            start_date,
            end_date,
            offset,
            limit,
        } => run_orb(
            &config,
            ticker.as_deref(),
            &range_start,
            &range_end,
            &start_date,
            &end_date,
            offset,
            limit,
        ),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TradeblocksError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn parse_date_arg(arg: Option<&str>) -> Result<Option<chrono::NaiveDate>, ExitCode> {
    match arg {
        Some(s) => match parse_date(s) {
            Ok(d) => Ok(Some(d)),
            Err(e) => {
                eprintln!("error: {e}");
                Err(ExitCode::from(&e))
            }
        },
        None => Ok(None),
    }
}

fn emit_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize result: {e}");
            ExitCode::from(1)
        }
    }
}

fn default_ticker_from(config: &dyn ConfigPort) -> String {
    config
        .get_string("market", "default_ticker")
        .unwrap_or_else(|| DEFAULT_TICKER.to_string())
}

#[cfg(feature = "sqlite")]
mod pipeline {
    use super::*;
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::enrich::{EnrichOptions, EnrichResult, TradeEnricher};
    use crate::domain::trade::{filter_trades, Trade};
    use crate::ports::trade_port::TradePort;
    use chrono::NaiveDate;

    pub fn open_store(config: &FileConfigAdapter) -> Result<SqliteAdapter, ExitCode> {
        SqliteAdapter::from_config(config).map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        })
    }

    pub fn load_block(
        store: &SqliteAdapter,
        block: &str,
        strategy: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Trade>, ExitCode> {
        eprintln!("Loading block {block}");
        let trades = store.load_trades(block).map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        })?;

        let filtered = filter_trades(&trades, strategy, start_date, end_date);
        eprintln!("  {} trades ({} after filters)", trades.len(), filtered.len());
        Ok(filtered)
    }

    pub fn enrich_block(
        store: &SqliteAdapter,
        trades: &[Trade],
        options: &EnrichOptions,
    ) -> Result<EnrichResult, ExitCode> {
        let enricher = TradeEnricher::new(store);
        enricher.enrich(trades, options).map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn run_enrich(
    config_path: &PathBuf,
    block: &str,
    strategy: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    include_outcome: bool,
    include_intraday: bool,
    include_intraday_outcome: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let start_date = match parse_date_arg(start_date) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let end_date = match parse_date_arg(end_date) {
        Ok(d) => d,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::domain::enrich::EnrichOptions;

        let store = match pipeline::open_store(&config) {
            Ok(s) => s,
            Err(code) => return code,
        };
        let trades = match pipeline::load_block(&store, block, strategy, start_date, end_date) {
            Ok(t) => t,
            Err(code) => return code,
        };

        let options = EnrichOptions {
            include_outcome: include_outcome || config.get_bool("enrich", "include_outcome", false),
            include_intraday: include_intraday
                || config.get_bool("enrich", "include_intraday", false),
            include_intraday_outcome: include_intraday_outcome
                || config.get_bool("enrich", "include_intraday_outcome", false),
            default_ticker: default_ticker_from(&config),
        };

        let result = match pipeline::enrich_block(&store, &trades, &options) {
            Ok(r) => r,
            Err(code) => return code,
        };

        eprintln!("{}", result.summary());
        emit_json(&result)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (
            config,
            block,
            strategy,
            start_date,
            end_date,
            include_outcome,
            include_intraday,
            include_intraday_outcome,
        );
        eprintln!("error: sqlite feature is required for enrich");
        ExitCode::from(1)
    }
}

fn run_segment(
    config_path: &PathBuf,
    block: &str,
    dimension: &str,
    strategy: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> ExitCode {
    use crate::domain::segmentation::SegmentDimension;

    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let dimension = match SegmentDimension::parse(dimension) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    let start_date = match parse_date_arg(start_date) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let end_date = match parse_date_arg(end_date) {
        Ok(d) => d,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::domain::enrich::EnrichOptions;
        use crate::domain::segmentation::segment_trades;

        let store = match pipeline::open_store(&config) {
            Ok(s) => s,
            Err(code) => return code,
        };
        let trades = match pipeline::load_block(&store, block, strategy, start_date, end_date) {
            Ok(t) => t,
            Err(code) => return code,
        };

        let options = EnrichOptions {
            default_ticker: default_ticker_from(&config),
            ..EnrichOptions::default()
        };
        let enriched = match pipeline::enrich_block(&store, &trades, &options) {
            Ok(r) => r,
            Err(code) => return code,
        };

        let result = segment_trades(&enriched.trades, dimension);
        eprintln!("{}", result.summary());
        emit_json(&result)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, block, dimension, strategy, start_date, end_date);
        eprintln!("error: sqlite feature is required for segment");
        ExitCode::from(1)
    }
}

fn run_suggest_filters(
    config_path: &PathBuf,
    block: &str,
    min_improvement: Option<f64>,
    strategy: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> ExitCode {
    use crate::domain::filters::DEFAULT_MIN_IMPROVEMENT_PCT;

    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let start_date = match parse_date_arg(start_date) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let end_date = match parse_date_arg(end_date) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let min_improvement = min_improvement.unwrap_or_else(|| {
        config.get_double("filters", "min_improvement", DEFAULT_MIN_IMPROVEMENT_PCT)
    });

    #[cfg(feature = "sqlite")]
    {
        use crate::domain::enrich::EnrichOptions;
        use crate::domain::filters::suggest_filters;

        let store = match pipeline::open_store(&config) {
            Ok(s) => s,
            Err(code) => return code,
        };
        let trades = match pipeline::load_block(&store, block, strategy, start_date, end_date) {
            Ok(t) => t,
            Err(code) => return code,
        };

        let options = EnrichOptions {
            default_ticker: default_ticker_from(&config),
            ..EnrichOptions::default()
        };
        let enriched = match pipeline::enrich_block(&store, &trades, &options) {
            Ok(r) => r,
            Err(code) => return code,
        };

        let result = match suggest_filters(&enriched.trades, min_improvement) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(&e);
            }
        };

        eprintln!("{}", result.summary());
        emit_json(&result)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config, block, min_improvement, strategy, start_date, end_date);
        eprintln!("error: sqlite feature is required for suggest-filters");
        ExitCode::from(1)
    }
}

#[allow(clippy::too_many_arguments)]
fn run_orb(
    config_path: &PathBuf,
    ticker: Option<&str>,
    range_start: &str,
    range_end: &str,
    start_date: &str,
    end_date: &str,
    offset: Option<usize>,
    limit: Option<usize>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let start_date = match parse_date(start_date) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    let end_date = match parse_date(end_date) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let ticker = ticker
        .map(str::to_string)
        .unwrap_or_else(|| default_ticker_from(&config));

    #[cfg(feature = "sqlite")]
    {
        use crate::domain::orb::compute_orb;

        let store = match pipeline::open_store(&config) {
            Ok(s) => s,
            Err(code) => return code,
        };

        eprintln!("Computing opening range {range_start}-{range_end} for {ticker}");
        let result = match compute_orb(
            &store,
            &ticker,
            range_start,
            range_end,
            start_date,
            end_date,
            offset,
            limit,
        ) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(&e);
            }
        };

        eprintln!("{}", result.summary());
        emit_json(&result)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (
            config, ticker, range_start, range_end, start_date, end_date, offset, limit,
        );
        eprintln!("error: sqlite feature is required for orb");
        ExitCode::from(1)
    }
}
