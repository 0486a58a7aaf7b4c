//! Out-of-sample risk / return metrics for a fixed weight vector.

use crate::domain::returns::ReturnMatrix;
use crate::domain::solver::WeightVector;
use chrono::NaiveDate;

pub const DEFAULT_TRADING_DAYS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskMetrics {
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Worst peak-to-trough decline of the growth curve; `<= 0`.
    pub max_drawdown: f64,
}

/// One day of the evaluated portfolio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub value: f64,
}

impl RiskMetrics {
    /// Applies `weights` to `evaluation` and annualises with `trading_days`.
    ///
    /// All four metrics are zero when no evaluation data remains after
    /// restricting to weighted assets that have observations.
    pub fn compute(evaluation: &ReturnMatrix, weights: &WeightVector, trading_days: u32) -> Self {
        let daily = portfolio_returns(evaluation, weights);
        Self::from_daily(&daily, trading_days)
    }

    pub fn from_daily(daily: &[DailyReturn], trading_days: u32) -> Self {
        if daily.is_empty() {
            return RiskMetrics::default();
        }

        let days = f64::from(trading_days);
        let (mean, stddev) = mean_and_population_stddev(daily);

        let annual_return = mean * days;
        let volatility = stddev * days.sqrt();
        let sharpe_ratio = if volatility == 0.0 {
            0.0
        } else {
            annual_return / volatility
        };

        RiskMetrics {
            annual_return,
            volatility,
            sharpe_ratio,
            max_drawdown: compute_max_drawdown(daily),
        }
    }
}

/// Weighted daily portfolio returns over `evaluation`.
///
/// Only assets present in both the matrix and the weight vector that have
/// at least one observation are used; weights are not rescaled. A date is
/// included when at least one of those assets has a return that day, and a
/// missing asset-day contributes nothing.
pub fn portfolio_returns(evaluation: &ReturnMatrix, weights: &WeightVector) -> Vec<DailyReturn> {
    let held: Vec<(&[Option<f64>], f64)> = evaluation
        .columns()
        .filter(|(_, col)| col.iter().any(Option::is_some))
        .filter_map(|(ticker, col)| weights.get(ticker).map(|w| (col, w)))
        .collect();

    if held.is_empty() {
        return Vec::new();
    }

    evaluation
        .dates()
        .iter()
        .enumerate()
        .filter_map(|(row, &date)| {
            let mut observed = false;
            let mut value = 0.0;
            for (col, w) in &held {
                if let Some(r) = col[row] {
                    observed = true;
                    value += w * r;
                }
            }
            observed.then_some(DailyReturn { date, value })
        })
        .collect()
}

fn mean_and_population_stddev(daily: &[DailyReturn]) -> (f64, f64) {
    let n = daily.len() as f64;
    let mean = daily.iter().map(|d| d.value).sum::<f64>() / n;
    let variance = daily.iter().map(|d| (d.value - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Minimum over the cumulative product curve of `curve / running_max - 1`.
fn compute_max_drawdown(daily: &[DailyReturn]) -> f64 {
    let mut growth = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for day in daily {
        growth *= 1.0 + day.value;
        if growth > peak {
            peak = growth;
        }
        if peak > 0.0 {
            let dd = growth / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}
