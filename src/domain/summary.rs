//! Cross-year highlights of a completed study.

use crate::domain::metrics::RiskMetrics;
use crate::domain::pipeline::YearlyPortfolioResult;
use std::collections::BTreeMap;

/// A year together with its evaluation metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearMetrics {
    pub year: i32,
    pub metrics: RiskMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudySummary {
    pub first_year: i32,
    pub last_year: i32,
    pub best_return: YearMetrics,
    pub worst_return: YearMetrics,
    pub lowest_volatility: YearMetrics,
    pub deepest_drawdown: YearMetrics,
    pub latest: YearMetrics,
    /// Arithmetic mean of each metric over all emitted years.
    pub average: RiskMetrics,
    /// Last year of the early half.
    pub split_year: i32,
    /// Means over years `<= split_year`, `None` when there are none.
    pub early: Option<RiskMetrics>,
    /// Means over years `> split_year`.
    pub late: Option<RiskMetrics>,
    pub fallback_years: Vec<i32>,
}

impl StudySummary {
    /// `None` when no year produced a result. Ties go to the earliest year.
    pub fn compute(results: &BTreeMap<i32, YearlyPortfolioResult>, split_year: i32) -> Option<Self> {
        let rows: Vec<YearMetrics> = results
            .values()
            .map(|r| YearMetrics {
                year: r.year,
                metrics: r.metrics,
            })
            .collect();
        let first = *rows.first()?;
        let latest = *rows.last()?;

        let pick = |better: fn(&RiskMetrics, &RiskMetrics) -> bool| {
            rows.iter()
                .copied()
                .fold(first, |acc, row| if better(&row.metrics, &acc.metrics) { row } else { acc })
        };

        let (early, late): (Vec<YearMetrics>, Vec<YearMetrics>) =
            rows.iter().copied().partition(|r| r.year <= split_year);

        Some(StudySummary {
            first_year: first.year,
            last_year: latest.year,
            best_return: pick(|a, b| a.annual_return > b.annual_return),
            worst_return: pick(|a, b| a.annual_return < b.annual_return),
            lowest_volatility: pick(|a, b| a.volatility < b.volatility),
            deepest_drawdown: pick(|a, b| a.max_drawdown < b.max_drawdown),
            latest,
            average: average(&rows)?,
            split_year,
            early: average(&early),
            late: average(&late),
            fallback_years: results
                .values()
                .filter(|r| r.solve_status.is_fallback())
                .map(|r| r.year)
                .collect(),
        })
    }
}

fn average(rows: &[YearMetrics]) -> Option<RiskMetrics> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let mean = |f: fn(&RiskMetrics) -> f64| rows.iter().map(|r| f(&r.metrics)).sum::<f64>() / n;
    Some(RiskMetrics {
        annual_return: mean(|m| m.annual_return),
        volatility: mean(|m| m.volatility),
        sharpe_ratio: mean(|m| m.sharpe_ratio),
        max_drawdown: mean(|m| m.max_drawdown),
    })
}
