//! Long-only, capped, fully-invested Sharpe maximisation.
//!
//! Maximises `(w·μ)·T / (sqrt(w·Σ·w)·sqrt(T))` over the capped simplex
//! `{ 0 <= w_i <= w_max, Σ w_i = 1 }` by projected gradient ascent with
//! Armijo backtracking, starting from equal weights. The projection onto the
//! capped simplex is exact (bisection on the shift), so every iterate is
//! feasible and the result is a local optimum, not necessarily global.
//!
//! Any failure (non-finite objective, iteration limit, timeout, degenerate
//! output) is recovered by falling back to the equal-weight start, and the
//! path taken is reported in [`SolveStatus`].

use crate::domain::cleaning::CleanedTraining;
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-16;
const MAX_STEP: f64 = 1e4;
const ZERO_SUM: f64 = 1e-12;
const FEASIBILITY_SLACK: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Convergence threshold on both the largest weight change and the
    /// relative objective gain between iterates.
    pub tolerance: f64,
    /// Wall-clock cap per solve. Exceeding it counts as a solver failure.
    pub time_limit: Option<Duration>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            tolerance: 1e-9,
            time_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Fewer than two dense training rows; covariance is undefined.
    TooFewObservations,
    NonFiniteObjective,
    IterationLimit,
    TimedOut,
    /// The optimiser's weights summed to (numerically) zero after clipping.
    ZeroWeightSum,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FallbackReason::TooFewObservations => "too few observations",
            FallbackReason::NonFiniteObjective => "non-finite objective",
            FallbackReason::IterationLimit => "iteration limit",
            FallbackReason::TimedOut => "timed out",
            FallbackReason::ZeroWeightSum => "zero weight sum",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Converged { iterations: usize },
    FellBackToEqualWeight { reason: FallbackReason },
}

impl SolveStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SolveStatus::FellBackToEqualWeight { .. })
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Converged { iterations } => write!(f, "converged ({iterations} iterations)"),
            SolveStatus::FellBackToEqualWeight { reason } => write!(f, "equal weight ({reason})"),
        }
    }
}

/// Weights keyed by ticker. Covers the whole year's universe; assets that
/// did not survive training cleanup carry an explicit `0.0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    pub fn from_map(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    /// Weight for `ticker`, or `None` if it is not part of the vector.
    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.weights.get(ticker).copied()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.weights.contains_key(ticker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Sums to one within `tolerance` and every weight lies in `[0, max_weight]`.
    pub fn is_feasible(&self, max_weight: f64, tolerance: f64) -> bool {
        (self.sum() - 1.0).abs() <= tolerance
            && self
                .weights
                .values()
                .all(|&w| w >= 0.0 && w <= max_weight + tolerance)
    }

    /// Largest `n` positive holdings, heaviest first; ties by ticker.
    pub fn top(&self, n: usize) -> Vec<(&str, f64)> {
        let mut held: Vec<(&str, f64)> = self.iter().filter(|(_, w)| *w > 0.0).collect();
        held.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        held.truncate(n);
        held
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub weights: WeightVector,
    pub status: SolveStatus,
    /// Annualised in-sample Sharpe ratio of the chosen weights.
    pub training_sharpe: f64,
}

/// Annualised Sharpe objective built from a dense return matrix.
#[derive(Debug, Clone)]
pub struct SharpeObjective {
    mean: DVector<f64>,
    cov: DMatrix<f64>,
    trading_days: f64,
}

impl SharpeObjective {
    /// Sample mean and covariance (N - 1 denominator). `None` with fewer than
    /// two rows or no columns.
    pub fn from_returns(returns: &DMatrix<f64>, trading_days: f64) -> Option<Self> {
        let (rows, cols) = returns.shape();
        if rows < 2 || cols == 0 {
            return None;
        }

        let mean = DVector::from_iterator(cols, returns.column_iter().map(|c| c.mean()));
        let mut centered = returns.clone();
        for (j, mut col) in centered.column_iter_mut().enumerate() {
            col.add_scalar_mut(-mean[j]);
        }
        let cov = centered.transpose() * &centered / (rows as f64 - 1.0);

        Some(Self {
            mean,
            cov,
            trading_days,
        })
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn annualized_return(&self, w: &DVector<f64>) -> f64 {
        w.dot(&self.mean) * self.trading_days
    }

    pub fn annualized_volatility(&self, w: &DVector<f64>) -> f64 {
        let variance = w.dot(&(&self.cov * w));
        // Rounding can leave a tiny negative variance for degenerate inputs.
        let variance = if variance < 0.0 { 0.0 } else { variance };
        (variance * self.trading_days).sqrt()
    }

    /// Zero when the portfolio volatility is exactly zero.
    pub fn value(&self, w: &DVector<f64>) -> f64 {
        let vol = self.annualized_volatility(w);
        if vol == 0.0 {
            0.0
        } else {
            self.annualized_return(w) / vol
        }
    }

    pub fn gradient(&self, w: &DVector<f64>) -> DVector<f64> {
        let sigma_w = &self.cov * w;
        let variance = w.dot(&sigma_w);
        if variance <= 0.0 {
            return DVector::zeros(w.len());
        }
        let sd = variance.sqrt();
        let mu_w = w.dot(&self.mean);
        (&self.mean / sd - sigma_w * (mu_w / (sd * variance))) * self.trading_days.sqrt()
    }
}

/// Euclidean projection of `v` onto `{ 0 <= w_i <= cap, Σ w_i = 1 }`.
///
/// Requires `v.len() * cap >= 1`.
pub fn project_capped_simplex(v: &DVector<f64>, cap: f64) -> DVector<f64> {
    let mass = |tau: f64| v.iter().map(|x| (x - tau).clamp(0.0, cap)).sum::<f64>();

    let mut lo = v.iter().copied().fold(f64::INFINITY, f64::min) - cap;
    let mut hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mass(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON * hi.abs().max(1.0) {
            break;
        }
    }

    let tau = 0.5 * (lo + hi);
    v.map(|x| (x - tau).clamp(0.0, cap))
}

/// Clips every weight into `[0, cap]` and renormalises to sum to one.
///
/// Renormalising can push weights back above the cap; any overshoot is
/// moved onto the remaining headroom of uncapped assets. Returns `None` when
/// the clipped weights sum to (numerically) zero. Non-finite inputs are
/// treated as zero.
pub fn clip_and_renormalize(weights: &[f64], cap: f64) -> Option<Vec<f64>> {
    let mut w: Vec<f64> = weights
        .iter()
        .map(|x| if x.is_finite() { x.clamp(0.0, cap) } else { 0.0 })
        .collect();

    let total: f64 = w.iter().sum();
    if total <= ZERO_SUM {
        return None;
    }
    w.iter_mut().for_each(|x| *x /= total);

    let excess: f64 = w.iter().map(|x| (x - cap).max(0.0)).sum();
    if excess > 0.0 {
        let headroom: f64 = w.iter().map(|x| (cap - x).max(0.0)).sum();
        if headroom > 0.0 {
            for x in w.iter_mut() {
                if *x >= cap {
                    *x = cap;
                } else {
                    *x += excess * (cap - *x) / headroom;
                }
            }
        }
    }

    Some(w)
}

/// Whether `assets` weights capped at `max_weight` can sum to one.
pub fn is_cap_feasible(assets: usize, max_weight: f64) -> bool {
    assets > 0 && assets as f64 * max_weight >= 1.0 - FEASIBILITY_SLACK
}

/// Solves for the year's weights.
///
/// Optimises over `training.assets` and returns a vector over `universe`
/// with zeros for everything outside the training set. Returns `None` when
/// no feasible vector exists (no training assets, or too few of them for
/// `max_weight` to reach full investment).
pub fn solve_max_sharpe(
    training: &CleanedTraining,
    universe: &[String],
    max_weight: f64,
    trading_days: f64,
    settings: &SolverSettings,
) -> Option<Solution> {
    let n = training.assets.len();
    if !is_cap_feasible(n, max_weight) {
        return None;
    }

    let start = DVector::from_element(n, 1.0 / n as f64);
    let objective = SharpeObjective::from_returns(&training.returns, trading_days);

    let outcome = match &objective {
        Some(obj) => ascend(obj, &start, max_weight, settings),
        None => Err(FallbackReason::TooFewObservations),
    };

    let (raw, status) = match outcome {
        Ok((w, iterations)) => (w, SolveStatus::Converged { iterations }),
        Err(reason) => (start.clone(), SolveStatus::FellBackToEqualWeight { reason }),
    };

    let (finalized, status) = match clip_and_renormalize(raw.as_slice(), max_weight) {
        Some(w) => (w, status),
        None => (
            clip_and_renormalize(start.as_slice(), max_weight)?,
            SolveStatus::FellBackToEqualWeight {
                reason: FallbackReason::ZeroWeightSum,
            },
        ),
    };

    if let SolveStatus::FellBackToEqualWeight { reason } = status {
        warn!(assets = n, %reason, "solver fell back to equal weights");
    }

    let training_sharpe = objective
        .as_ref()
        .map(|obj| obj.value(&DVector::from_column_slice(&finalized)))
        .filter(|s| s.is_finite())
        .unwrap_or(0.0);

    let mut weights: BTreeMap<String, f64> =
        universe.iter().map(|t| (t.clone(), 0.0)).collect();
    for (ticker, w) in training.assets.iter().zip(finalized) {
        weights.insert(ticker.clone(), w);
    }

    Some(Solution {
        weights: WeightVector::from_map(weights),
        status,
        training_sharpe,
    })
}

fn ascend(
    objective: &SharpeObjective,
    start: &DVector<f64>,
    cap: f64,
    settings: &SolverSettings,
) -> Result<(DVector<f64>, usize), FallbackReason> {
    let deadline = settings.time_limit.map(|limit| Instant::now() + limit);

    let mut w = project_capped_simplex(start, cap);
    let mut f = objective.value(&w);
    if !f.is_finite() {
        return Err(FallbackReason::NonFiniteObjective);
    }

    let mut step = 1.0;
    for iteration in 1..=settings.max_iterations {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(FallbackReason::TimedOut);
        }

        let grad = objective.gradient(&w);
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(FallbackReason::NonFiniteObjective);
        }

        let mut alpha = step;
        let mut accepted = None;
        while alpha >= MIN_STEP {
            let candidate = project_capped_simplex(&(&w + &grad * alpha), cap);
            let fc = objective.value(&candidate);
            if !fc.is_finite() {
                return Err(FallbackReason::NonFiniteObjective);
            }
            if fc >= f + ARMIJO * grad.dot(&(&candidate - &w)) {
                accepted = Some((candidate, fc));
                break;
            }
            alpha *= 0.5;
        }

        // No ascent step of any size: w is stationary on the feasible set.
        let Some((candidate, fc)) = accepted else {
            debug!(iteration, sharpe = f, "no ascent step available");
            return Ok((w, iteration));
        };

        let moved = (&candidate - &w).amax();
        let gain = fc - f;
        w = candidate;
        f = fc;

        if moved <= settings.tolerance || gain.abs() <= settings.tolerance * (1.0 + f.abs()) {
            debug!(iteration, sharpe = f, "solver converged");
            return Ok((w, iteration));
        }
        step = (alpha * 2.0).min(MAX_STEP);
    }

    Err(FallbackReason::IterationLimit)
}
