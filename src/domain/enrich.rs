//! Trade enrichment: attaching entry-time market context to trades.

use crate::domain::daily::MarketDailyRow;
use crate::domain::error::TradeblocksError;
use crate::domain::field_timing::{FieldTiming, MarketField};
use crate::domain::intraday::{self, IntradayContext, IntradayRow};
use crate::domain::lag_join::{DailyContext, LagJoin};
use crate::domain::market_key::{TickerDateKey, DEFAULT_TICKER, GLOBAL_TICKER};
use crate::domain::trade::Trade;
use crate::ports::market_port::MarketDataPort;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Market context knowable at trade entry. `same_day` holds STATIC and
/// OPEN_KNOWN fields for the entry date; `prior_day` holds CLOSE_DERIVED
/// fields lagged to the prior trading day, `None` when that ticker has no
/// earlier history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryContext {
    pub same_day: BTreeMap<&'static str, f64>,
    pub prior_day: Option<BTreeMap<&'static str, f64>>,
}

impl EntryContext {
    fn from_daily(ctx: &DailyContext) -> Self {
        let mut same_day = ctx.same_day.fields_with_timing(FieldTiming::Static);
        same_day.extend(ctx.same_day.fields_with_timing(FieldTiming::OpenKnown));
        let prior_day = ctx
            .prior_day
            .as_ref()
            .map(|row| row.fields_with_timing(FieldTiming::CloseDerived));
        Self {
            same_day,
            prior_day,
        }
    }

    /// Field value as knowable at entry: same-day for STATIC/OPEN_KNOWN,
    /// lagged prior-day for CLOSE_DERIVED. Absent values stay absent.
    pub fn entry_value(&self, field: MarketField) -> Option<f64> {
        match field.timing() {
            FieldTiming::Static | FieldTiming::OpenKnown => {
                self.same_day.get(field.name()).copied()
            }
            FieldTiming::CloseDerived => self
                .prior_day
                .as_ref()
                .and_then(|m| m.get(field.name()).copied()),
        }
    }
}

/// A trade plus its market context. Built fresh per request, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrade {
    pub trade: Trade,
    /// `None` when no daily record matched the trade's ticker-date key.
    pub entry_context: Option<EntryContext>,
    /// Same-day CLOSE_DERIVED fields. Not knowable at entry; opt-in only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_fields: Option<BTreeMap<&'static str, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intraday_context: Option<IntradayContext>,
    /// Checkpoints strictly after entry. Not knowable at entry; opt-in only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intraday_outcome: Option<IntradayContext>,
}

impl EnrichedTrade {
    pub fn is_matched(&self) -> bool {
        self.entry_context.is_some()
    }

    pub fn entry_value(&self, field: MarketField) -> Option<f64> {
        self.entry_context.as_ref()?.entry_value(field)
    }
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub include_outcome: bool,
    pub include_intraday: bool,
    pub include_intraday_outcome: bool,
    pub default_ticker: String,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            include_outcome: false,
            include_intraday: false,
            include_intraday_outcome: false,
            default_ticker: DEFAULT_TICKER.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichResult {
    pub trades: Vec<EnrichedTrade>,
    pub matched: usize,
    /// Deduplicated, sorted composite keys with no daily record.
    pub unmatched_keys: Vec<String>,
}

impl EnrichResult {
    pub fn summary(&self) -> String {
        format!(
            "Enriched {} trades: {} matched, {} unmatched key(s)",
            self.trades.len(),
            self.matched,
            self.unmatched_keys.len()
        )
    }
}

/// Attaches entry context to trades. Lookups are batched per distinct ticker,
/// so query count is bounded by distinct tickers, not by trade count.
pub struct TradeEnricher<'a> {
    market: &'a dyn MarketDataPort,
}

struct IntradayLookup {
    underlying: HashMap<(String, NaiveDate), IntradayRow>,
    volatility: HashMap<(String, NaiveDate), IntradayRow>,
}

impl IntradayLookup {
    fn underlying_row(&self, key: &TickerDateKey) -> Option<&IntradayRow> {
        self.underlying.get(&(key.ticker.clone(), key.date))
    }

    /// Ticker-specific volatility row, falling back to the global feed.
    fn volatility_row(&self, key: &TickerDateKey) -> Option<&IntradayRow> {
        self.volatility
            .get(&(key.ticker.clone(), key.date))
            .or_else(|| self.volatility.get(&(GLOBAL_TICKER.to_string(), key.date)))
    }
}

impl<'a> TradeEnricher<'a> {
    pub fn new(market: &'a dyn MarketDataPort) -> Self {
        Self { market }
    }

    pub fn enrich(
        &self,
        trades: &[Trade],
        options: &EnrichOptions,
    ) -> Result<EnrichResult, TradeblocksError> {
        let keys: Vec<TickerDateKey> = trades
            .iter()
            .map(|t| TickerDateKey::for_trade(t, &options.default_ticker))
            .collect();

        let tickers: BTreeSet<String> = keys.iter().map(|k| k.ticker.clone()).collect();
        let join = LagJoin::build(self.market, &tickers)?;

        let want_intraday = options.include_intraday || options.include_intraday_outcome;
        let intraday = if want_intraday {
            Some(self.fetch_intraday_lookup(&keys, &tickers)?)
        } else {
            None
        };

        let mut enriched = Vec::with_capacity(trades.len());
        let mut unmatched: BTreeSet<String> = BTreeSet::new();
        let mut matched = 0usize;

        for (trade, key) in trades.iter().zip(&keys) {
            let daily = join.resolve(key);
            let entry_context = match &daily {
                Some(ctx) => {
                    matched += 1;
                    Some(EntryContext::from_daily(ctx))
                }
                None => {
                    unmatched.insert(key.composite());
                    None
                }
            };

            let outcome_fields = if options.include_outcome {
                daily
                    .as_ref()
                    .map(|ctx| outcome_fields_of(&ctx.same_day))
            } else {
                None
            };

            let (intraday_context, intraday_outcome) = match &intraday {
                Some(lookup) => {
                    let under = lookup.underlying_row(key);
                    let vol = lookup.volatility_row(key);
                    let entry = options.include_intraday.then(|| {
                        intraday::entry_context(trade.time_opened, under, vol)
                    });
                    let outcome = options.include_intraday_outcome.then(|| {
                        intraday::outcome_context(trade.time_opened, under, vol)
                    });
                    (entry, outcome)
                }
                None => (None, None),
            };

            enriched.push(EnrichedTrade {
                trade: trade.clone(),
                entry_context,
                outcome_fields,
                intraday_context,
                intraday_outcome,
            });
        }

        Ok(EnrichResult {
            trades: enriched,
            matched,
            unmatched_keys: unmatched.into_iter().collect(),
        })
    }

    fn fetch_intraday_lookup(
        &self,
        keys: &[TickerDateKey],
        tickers: &BTreeSet<String>,
    ) -> Result<IntradayLookup, TradeblocksError> {
        let mut underlying = HashMap::new();
        let mut volatility = HashMap::new();

        let mut ranges: HashMap<&str, (NaiveDate, NaiveDate)> = HashMap::new();
        for key in keys {
            ranges
                .entry(key.ticker.as_str())
                .and_modify(|(lo, hi)| {
                    *lo = (*lo).min(key.date);
                    *hi = (*hi).max(key.date);
                })
                .or_insert((key.date, key.date));
        }

        for ticker in tickers {
            let Some(&(start, end)) = ranges.get(ticker.as_str()) else {
                continue;
            };
            for row in self.market.fetch_intraday(ticker, start, end)? {
                underlying.insert((row.ticker.clone(), row.date), row);
            }
            // The global ticker's volatility rows come from the union fetch
            // below, which spans at least this ticker's own range.
            if ticker != GLOBAL_TICKER {
                for row in self.market.fetch_vix_intraday(ticker, start, end)? {
                    volatility.insert((row.ticker.clone(), row.date), row);
                }
            }
        }

        // Global volatility feed covers tickers with no feed of their own.
        // Fetched over the union of all trade dates: any single ticker's
        // range may miss dates another ticker trades on.
        if let Some((start, end)) = keys
            .iter()
            .map(|k| k.date)
            .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
                None => Some((d, d)),
            })
        {
            for row in self.market.fetch_vix_intraday(GLOBAL_TICKER, start, end)? {
                volatility.insert((row.ticker.clone(), row.date), row);
            }
        }

        Ok(IntradayLookup {
            underlying,
            volatility,
        })
    }
}

fn outcome_fields_of(same_day: &MarketDailyRow) -> BTreeMap<&'static str, f64> {
    same_day.fields_with_timing(FieldTiming::CloseDerived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_trade(ticker: Option<&str>, d: NaiveDate, time: &str, pl: f64) -> Trade {
        Trade {
            date_opened: d,
            time_opened: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            strategy: "Test".to_string(),
            ticker: ticker.map(str::to_string),
            pl,
            num_contracts: 1,
            premium: 100.0,
            opening_commissions: 1.0,
            closing_commissions: 1.0,
            reason_for_close: None,
        }
    }

    fn daily_row(ticker: &str, d: NaiveDate, vol_regime: i64, rsi: f64) -> MarketDailyRow {
        MarketDailyRow {
            day_of_week: Some(weekday_number(d)),
            gap_pct: Some(0.2),
            vol_regime: Some(vol_regime),
            rsi_14: Some(rsi),
            close: Some(4700.0),
            ..MarketDailyRow::new(ticker, d)
        }
    }

    fn weekday_number(d: NaiveDate) -> i64 {
        use chrono::Datelike;
        d.weekday().num_days_from_sunday() as i64 + 1
    }

    struct FakeMarket {
        daily: Vec<MarketDailyRow>,
        intraday: Vec<IntradayRow>,
        vix_intraday: Vec<IntradayRow>,
    }

    impl MarketDataPort for FakeMarket {
        fn fetch_daily_history(
            &self,
            ticker: &str,
        ) -> Result<Vec<MarketDailyRow>, TradeblocksError> {
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

    fn fake_market() -> FakeMarket {
        let mut spx_intraday = IntradayRow::empty("SPX", date(2024, 1, 9));
        spx_intraday.prices[0] = Some(4700.0);
        spx_intraday.prices[1] = Some(4705.0);
        spx_intraday.prices[2] = Some(4710.0);

        let mut vix_intraday = IntradayRow::empty("SPX", date(2024, 1, 9));
        vix_intraday.prices[0] = Some(13.2);
        vix_intraday.prices[2] = Some(13.8);

        FakeMarket {
            daily: vec![
                daily_row("SPX", date(2024, 1, 8), 3, 55.0),
                daily_row("SPX", date(2024, 1, 9), 4, 62.0),
            ],
            intraday: vec![spx_intraday],
            vix_intraday: vec![vix_intraday],
        }
    }

    #[test]
    fn enrich_splits_same_day_and_lagged_prior() {
        let market = fake_market();
        let enricher = TradeEnricher::new(&market);
        let trades = vec![make_trade(Some("SPX"), date(2024, 1, 9), "09:35", 50.0)];

        let result = enricher.enrich(&trades, &EnrichOptions::default()).unwrap();
        assert_eq!(result.matched, 1);
        assert!(result.unmatched_keys.is_empty());

        let ctx = result.trades[0].entry_context.as_ref().unwrap();
        // Same-day map carries only STATIC and OPEN_KNOWN fields.
        assert!(ctx.same_day.contains_key("Gap_Pct"));
        assert!(!ctx.same_day.contains_key("Vol_Regime"));
        // Prior-day map carries the lagged CLOSE_DERIVED values.
        let prior = ctx.prior_day.as_ref().unwrap();
        assert_eq!(prior.get("Vol_Regime"), Some(&3.0));
        assert_eq!(prior.get("RSI_14"), Some(&55.0));
    }

    #[test]
    fn entry_value_routes_by_timing() {
        let market = fake_market();
        let enricher = TradeEnricher::new(&market);
        let trades = vec![make_trade(Some("SPX"), date(2024, 1, 9), "09:35", 50.0)];

        let result = enricher.enrich(&trades, &EnrichOptions::default()).unwrap();
        let enriched = &result.trades[0];
        assert_eq!(enriched.entry_value(MarketField::GapPct), Some(0.2));
        assert_eq!(enriched.entry_value(MarketField::VolRegime), Some(3.0));
    }

    #[test]
    fn first_history_day_has_no_prior_map() {
        let market = fake_market();
        let enricher = TradeEnricher::new(&market);
        let trades = vec![make_trade(Some("SPX"), date(2024, 1, 8), "09:35", 50.0)];

        let result = enricher.enrich(&trades, &EnrichOptions::default()).unwrap();
        let ctx = result.trades[0].entry_context.as_ref().unwrap();
        assert!(ctx.prior_day.is_none());
        assert_eq!(result.trades[0].entry_value(MarketField::VolRegime), None);
    }

    #[test]
    fn unmatched_trades_keep_null_context_and_are_reported() {
        let market = fake_market();
        let enricher = TradeEnricher::new(&market);
        let trades = vec![
            make_trade(Some("SPX"), date(2024, 1, 9), "09:35", 50.0),
            make_trade(Some("SPX"), date(2024, 2, 1), "10:00", -20.0),
            make_trade(Some("SPX"), date(2024, 2, 1), "11:00", -10.0),
        ];

        let result = enricher.enrich(&trades, &EnrichOptions::default()).unwrap();
        assert_eq!(result.trades.len(), 3);
        assert_eq!(result.matched, 1);
        // Duplicate keys collapse to one entry, sorted.
        assert_eq!(result.unmatched_keys, vec!["SPX|2024-02-01"]);
        assert!(result.trades[1].entry_context.is_none());
    }

    #[test]
    fn outcome_fields_only_on_request() {
        let market = fake_market();
        let enricher = TradeEnricher::new(&market);
        let trades = vec![make_trade(Some("SPX"), date(2024, 1, 9), "09:35", 50.0)];

        let plain = enricher.enrich(&trades, &EnrichOptions::default()).unwrap();
        assert!(plain.trades[0].outcome_fields.is_none());

        let opts = EnrichOptions {
            include_outcome: true,
            ..EnrichOptions::default()
        };
        let with_outcome = enricher.enrich(&trades, &opts).unwrap();
        let outcome = with_outcome.trades[0].outcome_fields.as_ref().unwrap();
        // Same-day CLOSE_DERIVED, not the lagged value.
        assert_eq!(outcome.get("Vol_Regime"), Some(&4.0));
    }

    #[test]
    fn intraday_context_respects_entry_time() {
        let market = fake_market();
        let enricher = TradeEnricher::new(&market);
        let trades = vec![make_trade(Some("SPX"), date(2024, 1, 9), "09:45", 50.0)];

        let opts = EnrichOptions {
            include_intraday: true,
            include_intraday_outcome: true,
            ..EnrichOptions::default()
        };
        let result = enricher.enrich(&trades, &opts).unwrap();
        let enriched = &result.trades[0];

        let ctx = enriched.intraday_context.as_ref().unwrap();
        let labels: Vec<&str> = ctx.underlying.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["09:30", "09:45"]);
        assert_eq!(ctx.volatility.len(), 1);

        let outcome = enriched.intraday_outcome.as_ref().unwrap();
        let labels: Vec<&str> = outcome.underlying.iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["10:00"]);
    }

    #[test]
    fn volatility_falls_back_to_global_feed() {
        let mut market = fake_market();
        // NDX has an underlying feed but no NDX volatility rows.
        market.daily.push(daily_row("NDX", date(2024, 1, 9), 2, 50.0));
        let mut ndx_intraday = IntradayRow::empty("NDX", date(2024, 1, 9));
        ndx_intraday.prices[0] = Some(16500.0);
        market.intraday.push(ndx_intraday);

        let enricher = TradeEnricher::new(&market);
        let trades = vec![make_trade(Some("NDX"), date(2024, 1, 9), "10:00", 25.0)];
        let opts = EnrichOptions {
            include_intraday: true,
            ..EnrichOptions::default()
        };

        let result = enricher.enrich(&trades, &opts).unwrap();
        let ctx = result.trades[0].intraday_context.as_ref().unwrap();
        assert_eq!(ctx.underlying.len(), 1);
        // Global SPX-keyed volatility rows back-fill the NDX lookup.
        assert_eq!(ctx.volatility.len(), 2);
    }

    #[test]
    fn global_feed_fallback_spans_all_trade_dates() {
        // An SPX trade in January and an NDX trade in March: the fallback
        // must cover the March date even though SPX's own trades end in
        // January.
        let mut market = fake_market();
        market.daily.push(daily_row("NDX", date(2024, 3, 4), 2, 50.0));
        market.daily.push(daily_row("NDX", date(2024, 3, 5), 2, 50.0));
        let mut ndx_intraday = IntradayRow::empty("NDX", date(2024, 3, 5));
        ndx_intraday.prices[0] = Some(16500.0);
        market.intraday.push(ndx_intraday);
        let mut march_vix = IntradayRow::empty("SPX", date(2024, 3, 5));
        march_vix.prices[0] = Some(14.8);
        market.vix_intraday.push(march_vix);

        let enricher = TradeEnricher::new(&market);
        let trades = vec![
            make_trade(Some("SPX"), date(2024, 1, 9), "09:35", 50.0),
            make_trade(Some("NDX"), date(2024, 3, 5), "09:35", 25.0),
        ];
        let opts = EnrichOptions {
            include_intraday: true,
            ..EnrichOptions::default()
        };

        let result = enricher.enrich(&trades, &opts).unwrap();
        let ndx_ctx = result.trades[1].intraday_context.as_ref().unwrap();
        assert_eq!(ndx_ctx.volatility.len(), 1);
        assert_eq!(ndx_ctx.volatility[0].price, 14.8);
        // The SPX trade still sees its own January volatility row.
        let spx_ctx = result.trades[0].intraday_context.as_ref().unwrap();
        assert_eq!(spx_ctx.volatility[0].price, 13.2);
    }
}
