//! Domain error types.
//!
//! Only run-level failures are errors. Per-year degeneracies (empty windows,
//! solver fallbacks, zero volatility) are ordinary values; see
//! [`crate::domain::pipeline::SkipReason`] and
//! [`crate::domain::solver::SolveStatus`].

/// Top-level error type for sharpefolio.
#[derive(Debug, thiserror::Error)]
pub enum SharpefolioError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("invalid price series for {ticker}: {reason}")]
    InvalidPriceSeries { ticker: String, reason: String },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("universe error: {reason}")]
    Universe { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SharpefolioError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SharpefolioError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        SharpefolioError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&SharpefolioError> for std::process::ExitCode {
    fn from(err: &SharpefolioError) -> Self {
        let code: u8 = match err {
            SharpefolioError::Io(_) | SharpefolioError::Report { .. } => 1,
            SharpefolioError::ConfigParse { .. }
            | SharpefolioError::ConfigMissing { .. }
            | SharpefolioError::ConfigInvalid { .. } => 2,
            SharpefolioError::NoData { .. }
            | SharpefolioError::InvalidPriceSeries { .. }
            | SharpefolioError::Universe { .. } => 3,
            SharpefolioError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message() {
        let err = SharpefolioError::invalid("portfolio", "max_weight", "must be in (0, 1]");
        assert_eq!(
            err.to_string(),
            "invalid config value [portfolio] max_weight: must be in (0, 1]"
        );
    }

    #[test]
    fn config_missing_message() {
        let err = SharpefolioError::missing("data", "prices_dir");
        assert_eq!(err.to_string(), "missing config key [data] prices_dir");
    }

    #[test]
    fn exit_codes_by_family() {
        let cases = [
            (SharpefolioError::missing("data", "prices_dir"), "2"),
            (
                SharpefolioError::NoData {
                    ticker: "7203.T".into(),
                },
                "3",
            ),
            (
                SharpefolioError::InsufficientData {
                    reason: "no assets".into(),
                },
                "5",
            ),
            (
                SharpefolioError::Report {
                    reason: "disk full".into(),
                },
                "1",
            ),
        ];
        for (err, expected) in &cases {
            let code = std::process::ExitCode::from(err);
            assert_eq!(
                format!("{code:?}"),
                format!("{:?}", std::process::ExitCode::from(expected.parse::<u8>().unwrap()))
            );
        }
    }
}
