//! Per-ticker close-price CSV adapter.
//!
//! Each ticker lives in `<base_path>/<TICKER>.csv` with a header row naming
//! at least a `timestamp` (or `date`) column and a `close` column. Any other
//! columns, such as `volume`, are ignored.

use crate::domain::error::SharpefolioError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp. For the latter the date is
/// taken in the timestamp's own offset.
pub fn parse_timestamp(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, ticker: &str) -> Result<PriceSeries, SharpefolioError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|_| SharpefolioError::NoData {
            ticker: ticker.to_string(),
        })?;

        let invalid = |reason: String| SharpefolioError::InvalidPriceSeries {
            ticker: ticker.to_string(),
            reason,
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| invalid(format!("CSV header error: {e}")))?
            .clone();
        let date_col = column_index(&headers, &["timestamp", "date"])
            .ok_or_else(|| invalid("missing timestamp column".into()))?;
        let close_col = column_index(&headers, &["close"])
            .ok_or_else(|| invalid("missing close column".into()))?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| invalid(format!("CSV parse error: {e}")))?;

            let raw_date = record.get(date_col).unwrap_or_default();
            let date = parse_timestamp(raw_date)
                .ok_or_else(|| invalid(format!("invalid timestamp '{raw_date}'")))?;

            let raw_close = record.get(close_col).unwrap_or_default();
            let close: f64 = raw_close
                .trim()
                .parse()
                .map_err(|e| invalid(format!("invalid close value '{raw_close}': {e}")))?;

            points.push(PricePoint { date, close });
        }

        if points.is_empty() {
            return Err(SharpefolioError::NoData {
                ticker: ticker.to_string(),
            });
        }

        PriceSeries::from_unsorted(ticker, points)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SharpefolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SharpefolioError::Io(
            std::io::Error::new(
                e.kind(),
                format!("failed to read directory {}: {e}", self.base_path.display()),
            ),
        ))?;

        let mut tickers = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if let (true, Some(stem)) = (is_csv, path.file_stem()) {
                tickers.push(stem.to_string_lossy().into_owned());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
