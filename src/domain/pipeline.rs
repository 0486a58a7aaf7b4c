//! Yearly orchestration: one independent optimise-then-evaluate pass per
//! calendar year.
//!
//! Each year moves through the same stages: resolve the universe known on
//! January 1, slice the training and evaluation windows, clean the training
//! data, apply the observation gate, solve for weights and finally score
//! those weights on the evaluation year. A year that cannot get through a
//! stage is skipped with a [`SkipReason`]; it never aborts the run.
//!
//! Years share nothing mutable, so [`YearlyOrchestrator::run`] evaluates
//! them in parallel and reassembles the results in year order.

use crate::domain::cleaning::clean_training;
use crate::domain::metrics::RiskMetrics;
use crate::domain::returns::ReturnMatrix;
use crate::domain::solver::{SolveStatus, WeightVector, solve_max_sharpe};
use crate::domain::study::StudyConfig;
use crate::domain::universe::{UniverseMember, display_name};
use crate::domain::window::{Period, WindowBounds, resolve_windows};
use crate::ports::universe_port::UniverseResolver;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Why a year produced no result.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No snapshot on or before January 1, or none of its members has price
    /// data.
    NoUniverse,
    /// The universe has no returns during the evaluation year.
    EmptyEvaluation,
    InsufficientTraining { observations: usize, minimum: usize },
    /// Too few assets survived cleaning for the cap to allow full investment.
    InfeasibleCap { assets: usize, max_weight: f64 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoUniverse => write!(f, "no universe"),
            SkipReason::EmptyEvaluation => write!(f, "no evaluation data"),
            SkipReason::InsufficientTraining {
                observations,
                minimum,
            } => write!(
                f,
                "insufficient training data ({observations} < {minimum} observations)"
            ),
            SkipReason::InfeasibleCap { assets, max_weight } => write!(
                f,
                "{assets} assets cannot reach full investment with max weight {max_weight}"
            ),
        }
    }
}

/// One ranked position of a year's portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub rank: usize,
    pub ticker: String,
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearlyPortfolioResult {
    pub year: i32,
    pub period: Period,
    /// The year's universe, sorted by ticker.
    pub universe: Vec<UniverseMember>,
    /// One weight per universe member; members absent from cleaned training
    /// hold `0.0`.
    pub weights: WeightVector,
    pub metrics: RiskMetrics,
    pub solve_status: SolveStatus,
    pub training_sharpe: f64,
    /// Bounds of the cleaned training rows actually fed to the solver.
    pub training: WindowBounds,
    pub evaluation: WindowBounds,
}

impl YearlyPortfolioResult {
    /// Display name of `ticker`, or the ticker itself when it is not a member.
    pub fn name_of<'a>(&'a self, ticker: &'a str) -> &'a str {
        self.universe
            .iter()
            .find(|m| m.ticker == ticker)
            .map(|m| m.name.as_str())
            .unwrap_or(ticker)
    }

    /// Largest `n` positive positions, heaviest first.
    pub fn top_holdings(&self, n: usize) -> Vec<Holding> {
        self.weights
            .top(n)
            .into_iter()
            .enumerate()
            .map(|(i, (ticker, weight))| Holding {
                rank: i + 1,
                ticker: ticker.to_string(),
                name: self.name_of(ticker).to_string(),
                weight,
            })
            .collect()
    }

    /// Number of strictly positive weights.
    pub fn holding_count(&self) -> usize {
        self.weights.iter().filter(|(_, w)| *w > 0.0).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum YearOutcome {
    Emitted(Box<YearlyPortfolioResult>),
    Skipped(SkipReason),
}

/// Every requested year, split into emitted results and skips.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudyOutcome {
    pub results: BTreeMap<i32, YearlyPortfolioResult>,
    pub skipped: BTreeMap<i32, SkipReason>,
}

impl StudyOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn fallback_years(&self) -> Vec<i32> {
        self.results
            .values()
            .filter(|r| r.solve_status.is_fallback())
            .map(|r| r.year)
            .collect()
    }
}

pub struct YearlyOrchestrator<'a> {
    matrix: &'a ReturnMatrix,
    resolver: &'a dyn UniverseResolver,
    fallback_names: &'a HashMap<String, String>,
    config: &'a StudyConfig,
}

impl<'a> YearlyOrchestrator<'a> {
    pub fn new(
        matrix: &'a ReturnMatrix,
        resolver: &'a dyn UniverseResolver,
        fallback_names: &'a HashMap<String, String>,
        config: &'a StudyConfig,
    ) -> Self {
        Self {
            matrix,
            resolver,
            fallback_names,
            config,
        }
    }

    /// Runs every year in `years` and collects the outcomes by year.
    pub fn run<I>(&self, years: I) -> StudyOutcome
    where
        I: IntoIterator<Item = i32>,
    {
        let years: Vec<i32> = years.into_iter().collect();
        let outcomes: Vec<(i32, YearOutcome)> = years
            .par_iter()
            .map(|&year| (year, self.run_year(year)))
            .collect();

        let mut study = StudyOutcome::default();
        for (year, outcome) in outcomes {
            match outcome {
                YearOutcome::Emitted(result) => {
                    study.results.insert(year, *result);
                }
                YearOutcome::Skipped(reason) => {
                    info!(year, %reason, "year skipped");
                    study.skipped.insert(year, reason);
                }
            }
        }
        study
    }

    pub fn run_year(&self, year: i32) -> YearOutcome {
        match self.evaluate_year(year) {
            Ok(result) => YearOutcome::Emitted(Box::new(result)),
            Err(reason) => YearOutcome::Skipped(reason),
        }
    }

    fn evaluate_year(&self, year: i32) -> Result<YearlyPortfolioResult, SkipReason> {
        let snapshot = self
            .resolver
            .universe_for_year(year)
            .ok_or(SkipReason::NoUniverse)?;
        let tickers: Vec<&str> = snapshot
            .tickers()
            .filter(|t| self.matrix.contains(t))
            .collect();
        if tickers.is_empty() {
            return Err(SkipReason::NoUniverse);
        }
        debug!(
            year,
            as_of = %snapshot.as_of,
            members = snapshot.len(),
            priced = tickers.len(),
            "universe resolved"
        );

        let windows = resolve_windows(
            self.matrix,
            year,
            self.config.lookback,
            tickers.iter().copied(),
        )
        .ok_or(SkipReason::EmptyEvaluation)?;

        let cleaned = clean_training(&windows.training);
        debug!(
            year,
            raw_rows = windows.training.row_count(),
            rows = cleaned.observations(),
            assets = cleaned.assets.len(),
            "training cleaned"
        );

        let minimum = self.config.min_training_observations;
        if cleaned.observations() < minimum {
            return Err(SkipReason::InsufficientTraining {
                observations: cleaned.observations(),
                minimum,
            });
        }

        let universe: Vec<String> = tickers.iter().map(|t| t.to_string()).collect();
        let solution = solve_max_sharpe(
            &cleaned,
            &universe,
            self.config.max_weight,
            f64::from(self.config.trading_days_per_year),
            &self.config.solver,
        )
        .ok_or(SkipReason::InfeasibleCap {
            assets: cleaned.assets.len(),
            max_weight: self.config.max_weight,
        })?;
        debug!(year, status = %solution.status, "weights solved");

        let training = WindowBounds {
            start: cleaned.first_date(),
            end: cleaned.last_date(),
            observations: cleaned.observations(),
        };
        let evaluation = WindowBounds::of(&windows.evaluation);
        debug_assert!(match (training.end, evaluation.start) {
            (Some(t), Some(e)) => t < e,
            _ => true,
        });

        let metrics = RiskMetrics::compute(
            &windows.evaluation,
            &solution.weights,
            self.config.trading_days_per_year,
        );
        debug!(
            year,
            annual_return = metrics.annual_return,
            volatility = metrics.volatility,
            sharpe = metrics.sharpe_ratio,
            "year evaluated"
        );

        let members = universe
            .iter()
            .map(|t| UniverseMember {
                ticker: t.clone(),
                name: display_name(t, &snapshot, self.fallback_names),
            })
            .collect();

        Ok(YearlyPortfolioResult {
            year,
            period: windows.period,
            universe: members,
            weights: solution.weights,
            metrics,
            solve_status: solution.status,
            training_sharpe: solution.training_sharpe,
            training,
            evaluation,
        })
    }
}
