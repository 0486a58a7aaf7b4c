//! Parameters of a walk-forward portfolio study.

use crate::domain::metrics::DEFAULT_TRADING_DAYS_PER_YEAR;
use crate::domain::returns::AlignmentPolicy;
use crate::domain::solver::SolverSettings;
use crate::domain::window::Lookback;
use std::ops::RangeInclusive;

pub const DEFAULT_MAX_WEIGHT: f64 = 0.2;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 252;
pub const DEFAULT_MIN_TRAINING_OBSERVATIONS: usize = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct StudyConfig {
    /// Per-asset weight cap, in `(0, 1]`.
    pub max_weight: f64,
    pub lookback: Lookback,
    /// Minimum fully observed training rows before a year is optimised.
    pub min_training_observations: usize,
    pub trading_days_per_year: u32,
    pub alignment: AlignmentPolicy,
    pub solver: SolverSettings,
    pub start_year: i32,
    pub end_year: i32,
}

impl StudyConfig {
    /// Defaults for everything except the year range.
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            max_weight: DEFAULT_MAX_WEIGHT,
            lookback: Lookback::Days(DEFAULT_LOOKBACK_DAYS),
            min_training_observations: DEFAULT_MIN_TRAINING_OBSERVATIONS,
            trading_days_per_year: DEFAULT_TRADING_DAYS_PER_YEAR,
            alignment: AlignmentPolicy::default(),
            solver: SolverSettings::default(),
            start_year,
            end_year,
        }
    }

    /// Evaluation years, inclusive. Empty when `start_year > end_year`.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    /// Year at which the summary splits results into an early and a late
    /// half: the midpoint of the range, rounded down.
    pub fn default_split_year(&self) -> i32 {
        self.start_year + (self.end_year - self.start_year) / 2
    }
}
