#![allow(dead_code)]

use chrono::NaiveDate;
use sharpefolio::domain::error::SharpefolioError;
use sharpefolio::domain::price::{PricePoint, PriceSeries};
use sharpefolio::domain::study::StudyConfig;
use sharpefolio::domain::universe::UniverseSnapshot;
use sharpefolio::ports::data_port::DataPort;
use sharpefolio::ports::universe_port::UniverseResolver;
use std::collections::{BTreeMap, HashMap};
use std::process::ExitCode;

pub struct MockDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.data.insert(series.ticker().to_string(), series);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, ticker: &str) -> Result<PriceSeries, SharpefolioError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SharpefolioError::InvalidPriceSeries {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .get(ticker)
            .cloned()
            .ok_or_else(|| SharpefolioError::NoData {
                ticker: ticker.to_string(),
            })
    }

    fn list_tickers(&self) -> Result<Vec<String>, SharpefolioError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// Universe keyed by year; years without an entry have no universe.
pub struct MockResolver {
    pub years: BTreeMap<i32, UniverseSnapshot>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self {
            years: BTreeMap::new(),
        }
    }

    pub fn with_year(mut self, year: i32, tickers: &[&str]) -> Self {
        self.years.insert(year, snapshot(date(year - 1, 12, 31), tickers));
        self
    }

    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>, tickers: &[&str]) -> Self {
        for year in years {
            self = self.with_year(year, tickers);
        }
        self
    }
}

impl UniverseResolver for MockResolver {
    fn universe_for_year(&self, year: i32) -> Option<UniverseSnapshot> {
        self.years.get(&year).cloned()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Members named `<TICKER> Holdings`.
pub fn snapshot(as_of: NaiveDate, tickers: &[&str]) -> UniverseSnapshot {
    UniverseSnapshot::new(
        as_of,
        tickers
            .iter()
            .map(|t| (t.to_string(), format!("{t} Holdings")))
            .collect(),
    )
}

/// Consecutive calendar-day closes starting at `start`, compounding a
/// deterministic wavy return that differs per `seed`.
pub fn generate_series(ticker: &str, start: NaiveDate, days: usize, seed: usize) -> PriceSeries {
    let mut close = 100.0;
    let points = (0..days)
        .map(|i| {
            let point = PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close,
            };
            let t = i as f64;
            let r = 0.0003 * (seed as f64 + 1.0) + 0.012 * (t * 0.29 + seed as f64 * 1.7).sin();
            close *= 1.0 + r;
            point
        })
        .collect();
    PriceSeries::new(ticker, points).unwrap()
}

/// Series covering `start..=end` inclusive.
pub fn series_between(ticker: &str, start: NaiveDate, end: NaiveDate, seed: usize) -> PriceSeries {
    let days = (end - start).num_days() as usize + 1;
    generate_series(ticker, start, days, seed)
}

pub fn series_from_closes(ticker: &str, rows: &[(NaiveDate, f64)]) -> PriceSeries {
    PriceSeries::new(
        ticker,
        rows.iter()
            .map(|&(date, close)| PricePoint { date, close })
            .collect(),
    )
    .unwrap()
}

pub fn sample_study(start_year: i32, end_year: i32) -> StudyConfig {
    StudyConfig {
        max_weight: 0.5,
        ..StudyConfig::new(start_year, end_year)
    }
}

pub fn exit_code_is(code: ExitCode, expected: u8) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::from(expected))
}
