//! Dated universe snapshots and fallback display names from CSV.
//!
//! Snapshot file rows are `as_of,ticker,name` (the `name` column may be
//! empty or absent). The optional names file has rows `ticker,name`.

use crate::adapters::csv_adapter::parse_timestamp;
use crate::domain::error::SharpefolioError;
use crate::domain::universe::{SnapshotBook, UniverseSnapshot};
use crate::ports::universe_port::UniverseResolver;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub struct SnapshotUniverseAdapter {
    book: SnapshotBook,
    names: HashMap<String, String>,
}

impl SnapshotUniverseAdapter {
    pub fn from_files(
        universe_file: &Path,
        names_file: Option<&Path>,
    ) -> Result<Self, SharpefolioError> {
        let snapshots = read_file(universe_file)?;
        let names = match names_file {
            Some(path) => read_file(path)?,
            None => String::new(),
        };
        Self::from_strings(&snapshots, &names)
    }

    pub fn from_strings(snapshots: &str, names: &str) -> Result<Self, SharpefolioError> {
        let book = parse_snapshots(snapshots)?;
        if book.is_empty() {
            return Err(SharpefolioError::Universe {
                reason: "no universe snapshots found".into(),
            });
        }

        let names = parse_names(names)?;
        debug!(
            snapshots = book.snapshot_count(),
            tickers = book.all_tickers().len(),
            fallback_names = names.len(),
            "universe loaded"
        );

        Ok(Self { book, names })
    }

    pub fn book(&self) -> &SnapshotBook {
        &self.book
    }

    /// Ticker to display name from the names file, consulted only when the
    /// year's own snapshot entry has no name.
    pub fn fallback_names(&self) -> &HashMap<String, String> {
        &self.names
    }
}

impl UniverseResolver for SnapshotUniverseAdapter {
    fn universe_for_year(&self, year: i32) -> Option<UniverseSnapshot> {
        self.book.for_year(year)
    }
}

fn read_file(path: &Path) -> Result<String, SharpefolioError> {
    fs::read_to_string(path).map_err(|e| SharpefolioError::Universe {
        reason: format!("failed to read {}: {e}", path.display()),
    })
}

fn parse_snapshots(content: &str) -> Result<SnapshotBook, SharpefolioError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut book = SnapshotBook::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| SharpefolioError::Universe {
            reason: format!("CSV parse error: {e}"),
        })?;
        let raw_date = record.get(0).unwrap_or_default();
        let as_of = parse_timestamp(raw_date).ok_or_else(|| SharpefolioError::Universe {
            reason: format!("invalid as_of '{raw_date}' on row {}", line + 1),
        })?;
        let ticker = record.get(1).unwrap_or_default();
        let name = record.get(2).unwrap_or_default();
        book.insert(as_of, ticker, name)?;
    }

    Ok(book)
}

fn parse_names(content: &str) -> Result<HashMap<String, String>, SharpefolioError> {
    let mut names = HashMap::new();
    if content.trim().is_empty() {
        return Ok(names);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    for result in rdr.records() {
        let record = result.map_err(|e| SharpefolioError::Universe {
            reason: format!("CSV parse error in names file: {e}"),
        })?;
        let ticker = record.get(0).unwrap_or_default().trim();
        let name = record.get(1).unwrap_or_default().trim();
        if !ticker.is_empty() && !name.is_empty() {
            names.insert(ticker.to_string(), name.to_string());
        }
    }
    Ok(names)
}
