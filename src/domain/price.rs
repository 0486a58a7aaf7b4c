//! Daily closing-price series for a single asset.

use crate::domain::error::SharpefolioError;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Ordered closes for one ticker. Dates are strictly increasing and every
/// close is finite; the constructor rejects anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SharpefolioError> {
        let ticker = ticker.into();

        if let Some(bad) = points.iter().find(|p| !p.close.is_finite()) {
            return Err(SharpefolioError::InvalidPriceSeries {
                ticker,
                reason: format!("non-finite close on {}", bad.date),
            });
        }

        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                let reason = if pair[1].date == pair[0].date {
                    format!("duplicate timestamp {}", pair[1].date)
                } else {
                    format!("timestamps out of order at {}", pair[1].date)
                };
                return Err(SharpefolioError::InvalidPriceSeries { ticker, reason });
            }
        }

        Ok(Self { ticker, points })
    }

    /// Builds a series from unordered points, sorting by date first.
    /// Duplicate dates are still rejected.
    pub fn from_unsorted(
        ticker: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, SharpefolioError> {
        points.sort_by_key(|p| p.date);
        Self::new(ticker, points)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last date with a close, or `None` for an empty series.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }
}
