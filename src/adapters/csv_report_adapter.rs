//! CSV report adapter: one weight file per emitted year plus a summary.
//!
//! Numbers are written with six decimals.

use crate::domain::error::SharpefolioError;
use crate::domain::pipeline::{StudyOutcome, YearlyPortfolioResult};
use crate::domain::window::WindowBounds;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

pub const SUMMARY_FILE: &str = "summary.csv";

pub fn weights_file_name(year: i32) -> String {
    format!("{year}_weights.csv")
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> SharpefolioError {
    SharpefolioError::Report {
        reason: format!("failed to write {}: {e}", path.display()),
    }
}

fn fixed(value: f64) -> String {
    format!("{value:.6}")
}

fn date_or_empty(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn bounds_fields(bounds: &WindowBounds) -> [String; 3] {
    [
        date_or_empty(bounds.start),
        date_or_empty(bounds.end),
        bounds.observations.to_string(),
    ]
}

fn write_weights(result: &YearlyPortfolioResult, path: &Path) -> Result<(), SharpefolioError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    wtr.write_record(["ticker", "name", "weight"])
        .map_err(|e| report_err(path, e))?;
    for (ticker, weight) in result.weights.iter() {
        wtr.write_record([ticker, result.name_of(ticker), fixed(weight).as_str()])
            .map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))
}

fn write_summary(outcome: &StudyOutcome, path: &Path) -> Result<(), SharpefolioError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    wtr.write_record([
        "year",
        "status",
        "annual_return",
        "volatility",
        "sharpe_ratio",
        "max_drawdown",
        "training_sharpe",
        "training_start",
        "training_end",
        "training_observations",
        "evaluation_start",
        "evaluation_end",
        "evaluation_observations",
    ])
    .map_err(|e| report_err(path, e))?;

    let years = outcome.results.keys().chain(outcome.skipped.keys());
    let mut years: Vec<i32> = years.copied().collect();
    years.sort_unstable();

    for year in years {
        let mut row = vec![year.to_string()];
        match (outcome.results.get(&year), outcome.skipped.get(&year)) {
            (Some(r), _) => {
                row.push(r.solve_status.to_string());
                row.extend(
                    [
                        r.metrics.annual_return,
                        r.metrics.volatility,
                        r.metrics.sharpe_ratio,
                        r.metrics.max_drawdown,
                        r.training_sharpe,
                    ]
                    .map(fixed),
                );
                row.extend(bounds_fields(&r.training));
                row.extend(bounds_fields(&r.evaluation));
            }
            (None, Some(reason)) => {
                row.push(format!("skipped: {reason}"));
                row.extend(std::iter::repeat_n(String::new(), 11));
            }
            (None, None) => continue,
        }
        wtr.write_record(&row).map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, outcome: &StudyOutcome, output_dir: &Path) -> Result<(), SharpefolioError> {
        fs::create_dir_all(output_dir).map_err(|e| report_err(output_dir, e))?;

        for (year, result) in &outcome.results {
            write_weights(result, &output_dir.join(weights_file_name(*year)))?;
        }
        write_summary(outcome, &output_dir.join(SUMMARY_FILE))?;

        info!(
            dir = %output_dir.display(),
            years = outcome.results.len(),
            "csv reports written"
        );
        Ok(())
    }
}
