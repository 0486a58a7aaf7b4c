//! Configuration validation.
//!
//! Validates every study key before a run so that bad input fails fast with
//! the offending section and key.

use crate::domain::error::SharpefolioError;
use crate::domain::returns::AlignmentPolicy;
use crate::domain::window::Lookback;
use crate::ports::config_port::ConfigPort;

pub fn validate_study_config(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    validate_data_paths(config)?;
    validate_max_weight(config)?;
    validate_lookback(config)?;
    validate_positive_int(config, "portfolio", "min_training_observations")?;
    validate_positive_int(config, "portfolio", "trading_days_per_year")?;
    validate_alignment(config)?;
    validate_years(config)?;
    validate_positive_int(config, "solver", "max_iterations")?;
    validate_tolerance(config)?;
    validate_time_limit(config)?;
    validate_report(config)?;
    Ok(())
}

fn validate_data_paths(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    for key in ["prices_dir", "universe_file"] {
        match config.get_string("data", key) {
            Some(s) if !s.trim().is_empty() => {}
            _ => return Err(SharpefolioError::missing("data", key)),
        }
    }
    Ok(())
}

fn validate_max_weight(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    let Some(raw) = config.get_string("portfolio", "max_weight") else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value > 0.0 && value <= 1.0 => Ok(()),
        _ => Err(SharpefolioError::invalid(
            "portfolio",
            "max_weight",
            "max_weight must be in (0, 1]",
        )),
    }
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    match config.get_string("portfolio", "lookback_days") {
        Some(raw) if Lookback::parse(&raw).is_none() => Err(SharpefolioError::invalid(
            "portfolio",
            "lookback_days",
            "lookback_days must be a positive integer or 'all'",
        )),
        _ => Ok(()),
    }
}

fn validate_alignment(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    match config.get_string("portfolio", "alignment") {
        Some(raw) if AlignmentPolicy::parse(&raw).is_none() => Err(SharpefolioError::invalid(
            "portfolio",
            "alignment",
            "alignment must be 'column_wise' or 'intersection'",
        )),
        _ => Ok(()),
    }
}

fn validate_years(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    let start = parse_year(config, "start_year")?;
    let end = parse_year(config, "end_year")?;
    if start > end {
        return Err(SharpefolioError::invalid(
            "portfolio",
            "start_year",
            "start_year must not be after end_year",
        ));
    }
    Ok(())
}

pub(crate) fn parse_year(config: &dyn ConfigPort, key: &str) -> Result<i32, SharpefolioError> {
    let raw = config
        .get_string("portfolio", key)
        .ok_or_else(|| SharpefolioError::missing("portfolio", key))?;
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|y| (1900..=9999).contains(y))
        .ok_or_else(|| {
            SharpefolioError::invalid("portfolio", key, format!("invalid {key}, expected YYYY"))
        })
}

fn validate_tolerance(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    let Some(raw) = config.get_string("solver", "tolerance") else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value > 0.0 && value.is_finite() => Ok(()),
        _ => Err(SharpefolioError::invalid(
            "solver",
            "tolerance",
            "tolerance must be positive",
        )),
    }
}

fn validate_time_limit(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    match config.get_string("solver", "time_limit_ms") {
        Some(raw) if raw.trim().parse::<u64>().is_err() => Err(SharpefolioError::invalid(
            "solver",
            "time_limit_ms",
            "time_limit_ms must be a non-negative integer",
        )),
        _ => Ok(()),
    }
}

fn validate_report(config: &dyn ConfigPort) -> Result<(), SharpefolioError> {
    if let Some(raw) = config.get_string("report", "split_year") {
        if raw.trim().parse::<i32>().is_err() {
            return Err(SharpefolioError::invalid(
                "report",
                "split_year",
                "split_year must be a year",
            ));
        }
    }
    validate_positive_int(config, "report", "top_holdings")
}

/// Optional integer key that, when present, must be at least 1.
fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), SharpefolioError> {
    match config.get_string(section, key) {
        Some(raw) if !matches!(raw.trim().parse::<i64>(), Ok(v) if v >= 1) => Err(
            SharpefolioError::invalid(section, key, format!("{key} must be at least 1")),
        ),
        _ => Ok(()),
    }
}
