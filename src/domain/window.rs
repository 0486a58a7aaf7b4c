//! Training / evaluation window resolution for a single calendar year.
//!
//! The evaluation window is the calendar year itself. The training window
//! always ends (exclusively) at January 1 of that year, so no evaluation-year
//! row can leak into training.

use crate::domain::returns::ReturnMatrix;
use chrono::{Duration, NaiveDate};

/// Length of history used for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// Trailing calendar days before January 1 of the evaluation year.
    Days(u32),
    /// Everything strictly before the evaluation year.
    AllHistory,
}

impl Lookback {
    /// Accepts a positive integer or one of `all`, `all-history`, `all_history`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        match value.as_str() {
            "all" | "all-history" | "all_history" => Some(Lookback::AllHistory),
            _ => value
                .parse::<u32>()
                .ok()
                .filter(|&days| days > 0)
                .map(Lookback::Days),
        }
    }
}

impl std::fmt::Display for Lookback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookback::Days(days) => write!(f, "{days} days"),
            Lookback::AllHistory => write!(f, "all history"),
        }
    }
}

/// Nominal calendar bounds of an evaluation year (Jan 1 .. Dec 31).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn for_year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    /// First day after the period; the exclusive upper bound for slicing.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end + Duration::days(1)
    }
}

/// Realized bounds of a window: the first and last dates actually used and
/// the number of rows. Both dates are `None` for an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowBounds {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub observations: usize,
}

impl WindowBounds {
    pub fn of(matrix: &ReturnMatrix) -> Self {
        Self {
            start: matrix.first_date(),
            end: matrix.last_date(),
            observations: matrix.row_count(),
        }
    }
}

/// The two slices for one evaluation year.
#[derive(Debug, Clone)]
pub struct YearWindows {
    pub period: Period,
    pub training: ReturnMatrix,
    pub evaluation: ReturnMatrix,
}

/// Slices `matrix` into training and evaluation windows for `year`,
/// restricted to `tickers`.
///
/// Returns `None` when the evaluation window is empty (no trading data for
/// the selected assets that year); such a year is not evaluable.
pub fn resolve_windows<'a, I>(
    matrix: &ReturnMatrix,
    year: i32,
    lookback: Lookback,
    tickers: I,
) -> Option<YearWindows>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    let period = Period::for_year(year)?;

    let evaluation = matrix.select(Some(period.start), period.end_exclusive(), tickers.clone());
    if evaluation.is_empty() {
        return None;
    }

    // A lookback reaching past the earliest representable date covers all
    // history.
    let training_start = match lookback {
        Lookback::Days(days) => period
            .start
            .checked_sub_signed(Duration::days(i64::from(days))),
        Lookback::AllHistory => None,
    };
    let training = matrix.select(training_start, period.start, tickers);

    Some(YearWindows {
        period,
        training,
        evaluation,
    })
}
