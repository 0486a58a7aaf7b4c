//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::adapters::snapshot_universe_adapter::SnapshotUniverseAdapter;
use crate::domain::config_validation::{parse_year, validate_study_config};
use crate::domain::error::SharpefolioError;
use crate::domain::metrics::DEFAULT_TRADING_DAYS_PER_YEAR;
use crate::domain::pipeline::{StudyOutcome, YearlyOrchestrator};
use crate::domain::price::PriceSeries;
use crate::domain::returns::{AlignmentPolicy, build_return_matrix};
use crate::domain::solver::SolverSettings;
use crate::domain::study::{
    DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_WEIGHT, DEFAULT_MIN_TRAINING_OBSERVATIONS, StudyConfig,
};
use crate::domain::universe::display_name;
use crate::domain::window::Lookback;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::universe_port::UniverseResolver;

pub const DEFAULT_OUTPUT_DIR: &str = "reports/portfolio";
pub const DEFAULT_TOP_HOLDINGS: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "sharpefolio",
    about = "Walk-forward maximum-Sharpe portfolio study"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the yearly study and write reports
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        start_year: Option<i32>,
        #[arg(long)]
        end_year: Option<i32>,
    },
    /// Validate a study configuration without running it
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the price data range per ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// List the universe known on January 1 of a year
    Universe {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        year: i32,
    },
}

/// Report output options from the `[report]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    /// Overrides the study's midpoint split when set.
    pub split_year: Option<i32>,
    pub top_holdings: usize,
    pub template_path: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            output,
            start_year,
            end_year,
        } => run_study(&config, output.as_ref(), start_year, end_year),
        Command::Validate { config } => run_dry_run(&config),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
        Command::Universe { config, year } => run_universe(&config, year),
    }
}

fn fail(err: SharpefolioError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

pub fn build_study_config(adapter: &dyn ConfigPort) -> Result<StudyConfig, SharpefolioError> {
    let lookback = match adapter.get_string("portfolio", "lookback_days") {
        Some(raw) => Lookback::parse(&raw).ok_or_else(|| {
            SharpefolioError::invalid(
                "portfolio",
                "lookback_days",
                "lookback_days must be a positive integer or 'all'",
            )
        })?,
        None => Lookback::Days(DEFAULT_LOOKBACK_DAYS),
    };
    let alignment = match adapter.get_string("portfolio", "alignment") {
        Some(raw) => AlignmentPolicy::parse(&raw).ok_or_else(|| {
            SharpefolioError::invalid(
                "portfolio",
                "alignment",
                "alignment must be 'column_wise' or 'intersection'",
            )
        })?,
        None => AlignmentPolicy::default(),
    };

    let defaults = SolverSettings::default();
    let time_limit_ms = adapter.get_int("solver", "time_limit_ms", 0).max(0) as u64;
    let solver = SolverSettings {
        max_iterations: adapter
            .get_int("solver", "max_iterations", defaults.max_iterations as i64)
            .max(1) as usize,
        tolerance: adapter.get_double("solver", "tolerance", defaults.tolerance),
        time_limit: (time_limit_ms > 0).then(|| Duration::from_millis(time_limit_ms)),
    };

    Ok(StudyConfig {
        max_weight: adapter.get_double("portfolio", "max_weight", DEFAULT_MAX_WEIGHT),
        lookback,
        min_training_observations: adapter
            .get_int(
                "portfolio",
                "min_training_observations",
                DEFAULT_MIN_TRAINING_OBSERVATIONS as i64,
            )
            .max(1) as usize,
        trading_days_per_year: adapter
            .get_int(
                "portfolio",
                "trading_days_per_year",
                i64::from(DEFAULT_TRADING_DAYS_PER_YEAR),
            )
            .clamp(1, i64::from(u32::MAX)) as u32,
        alignment,
        solver,
        start_year: parse_year(adapter, "start_year")?,
        end_year: parse_year(adapter, "end_year")?,
    })
}

pub fn build_report_settings(adapter: &dyn ConfigPort) -> ReportSettings {
    ReportSettings {
        output_dir: adapter
            .get_string("report", "output_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        split_year: adapter
            .get_string("report", "split_year")
            .and_then(|s| s.trim().parse().ok()),
        top_holdings: adapter
            .get_int("report", "top_holdings", DEFAULT_TOP_HOLDINGS as i64)
            .max(1) as usize,
        template_path: adapter
            .get_string("report", "template_path")
            .map(PathBuf::from),
    }
}

fn data_path(adapter: &dyn ConfigPort, key: &str) -> Result<PathBuf, SharpefolioError> {
    adapter
        .get_string("data", key)
        .map(PathBuf::from)
        .ok_or_else(|| SharpefolioError::missing("data", key))
}

pub fn load_universe(adapter: &dyn ConfigPort) -> Result<SnapshotUniverseAdapter, SharpefolioError> {
    let universe_file = data_path(adapter, "universe_file")?;
    let names_file = adapter.get_string("data", "names_file").map(PathBuf::from);
    SnapshotUniverseAdapter::from_files(&universe_file, names_file.as_deref())
}

/// Fetches every ticker, skipping (with a warning) those that fail to load.
pub fn load_prices(data_port: &dyn DataPort, tickers: &[String]) -> Vec<PriceSeries> {
    let mut loaded = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        match data_port.fetch_prices(ticker) {
            Ok(series) => loaded.push(series),
            Err(e) => warn!(%ticker, error = %e, "skipping ticker"),
        }
    }
    loaded
}

/// Loads prices, builds the return matrix and evaluates every configured
/// year. Fails only when no usable price data exists at all.
pub fn execute_study(
    data_port: &dyn DataPort,
    resolver: &dyn UniverseResolver,
    tickers: &[String],
    fallback_names: &HashMap<String, String>,
    study: &StudyConfig,
) -> Result<StudyOutcome, SharpefolioError> {
    let prices = load_prices(data_port, tickers);
    info!(
        requested = tickers.len(),
        loaded = prices.len(),
        "price series loaded"
    );

    let matrix = build_return_matrix(&prices, study.alignment)?;
    info!(
        rows = matrix.row_count(),
        assets = matrix.asset_count(),
        alignment = %study.alignment,
        "return matrix built"
    );

    let orchestrator = YearlyOrchestrator::new(&matrix, resolver, fallback_names, study);
    Ok(orchestrator.run(study.years()))
}

fn print_console_summary(outcome: &StudyOutcome) {
    eprintln!("\n=== Yearly Results ===");
    eprintln!(
        "{:<6} {:>10} {:>10} {:>8} {:>10} {:>9}  Solver",
        "Year", "Return", "Volatility", "Sharpe", "Drawdown", "Holdings"
    );
    for r in outcome.results.values() {
        eprintln!(
            "{:<6} {:>9.2}% {:>9.2}% {:>8.2} {:>9.2}% {:>9}  {}",
            r.year,
            r.metrics.annual_return * 100.0,
            r.metrics.volatility * 100.0,
            r.metrics.sharpe_ratio,
            r.metrics.max_drawdown * 100.0,
            r.holding_count(),
            r.solve_status,
        );
    }
    for (year, reason) in &outcome.skipped {
        eprintln!("{year:<6} skipped: {reason}");
    }
}

pub fn run_study_pipeline(
    data_port: &dyn DataPort,
    resolver: &dyn UniverseResolver,
    tickers: &[String],
    fallback_names: &HashMap<String, String>,
    study: &StudyConfig,
    report: &ReportSettings,
) -> ExitCode {
    eprintln!(
        "Running study: {} tickers, {} to {}, max weight {}, lookback {}",
        tickers.len(),
        study.start_year,
        study.end_year,
        study.max_weight,
        study.lookback,
    );

    let outcome = match execute_study(data_port, resolver, tickers, fallback_names, study) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    print_console_summary(&outcome);

    if let Err(e) = CsvReportAdapter::new().write(&outcome, &report.output_dir) {
        return fail(e);
    }

    if outcome.is_empty() {
        eprintln!("\nNo year produced a portfolio; summary report not written");
    } else {
        let split_year = report
            .split_year
            .unwrap_or_else(|| study.default_split_year());
        let markdown = MarkdownReportAdapter::new(split_year, report.top_holdings);
        let markdown = match &report.template_path {
            Some(path) => match markdown.with_template_file(path) {
                Ok(m) => m,
                Err(e) => return fail(e),
            },
            None => markdown,
        };
        if let Err(e) = markdown.write(&outcome, &report.output_dir) {
            return fail(e);
        }
    }

    eprintln!("\nReports written to: {}", report.output_dir.display());
    ExitCode::SUCCESS
}

fn run_study(
    config_path: &Path,
    output: Option<&PathBuf>,
    start_year: Option<i32>,
    end_year: Option<i32>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_study_config(&adapter) {
        return fail(e);
    }

    // Stage 2: Build study parameters, applying CLI overrides
    let mut study = match build_study_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    study.start_year = start_year.unwrap_or(study.start_year);
    study.end_year = end_year.unwrap_or(study.end_year);
    if study.start_year > study.end_year {
        return fail(SharpefolioError::invalid(
            "portfolio",
            "start_year",
            "start_year must not be after end_year",
        ));
    }

    let mut report = build_report_settings(&adapter);
    if let Some(dir) = output {
        report.output_dir = dir.clone();
    }

    // Stage 3: Universe snapshots and price source
    let universe = match load_universe(&adapter) {
        Ok(u) => u,
        Err(e) => return fail(e),
    };
    let prices_dir = match data_path(&adapter, "prices_dir") {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let data_port = CsvAdapter::new(prices_dir);
    let tickers = universe.book().all_tickers();

    // Stage 4: Run and report
    run_study_pipeline(
        &data_port,
        &universe,
        &tickers,
        universe.fallback_names(),
        &study,
        &report,
    )
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_study_config(&adapter) {
        return fail(e);
    }
    let study = match build_study_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let report = build_report_settings(&adapter);
    eprintln!("Config validated successfully");

    eprintln!("\nStudy parameters:");
    eprintln!("  years:                     {} to {}", study.start_year, study.end_year);
    eprintln!("  max_weight:                {}", study.max_weight);
    eprintln!("  lookback:                  {}", study.lookback);
    eprintln!("  min_training_observations: {}", study.min_training_observations);
    eprintln!("  trading_days_per_year:     {}", study.trading_days_per_year);
    eprintln!("  alignment:                 {}", study.alignment);

    eprintln!("\nSolver:");
    eprintln!("  max_iterations: {}", study.solver.max_iterations);
    eprintln!("  tolerance:      {:e}", study.solver.tolerance);
    match study.solver.time_limit {
        Some(limit) => eprintln!("  time_limit:     {} ms", limit.as_millis()),
        None => eprintln!("  time_limit:     none"),
    }

    eprintln!("\nReport:");
    eprintln!("  output_dir:   {}", report.output_dir.display());
    eprintln!(
        "  split_year:   {}",
        report.split_year.unwrap_or_else(|| study.default_split_year())
    );
    eprintln!("  top_holdings: {}", report.top_holdings);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, ticker: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = match data_path(&config, "prices_dir") {
        Ok(p) => CsvAdapter::new(p),
        Err(e) => return fail(e),
    };

    let tickers = match ticker {
        Some(t) => vec![t.to_string()],
        None => match data_port.list_tickers() {
            Ok(t) => t,
            Err(e) => return fail(e),
        },
    };

    for t in &tickers {
        match data_port.get_data_range(t) {
            Ok(Some((first, last, count))) => {
                println!("{t}: {count} rows, {first} to {last}");
            }
            Ok(None) => eprintln!("{t}: no data found"),
            Err(e) => eprintln!("error reading {t}: {e}"),
        }
    }
    ExitCode::SUCCESS
}

fn run_universe(config_path: &Path, year: i32) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let universe = match load_universe(&config) {
        Ok(u) => u,
        Err(e) => return fail(e),
    };

    let Some(snapshot) = universe.universe_for_year(year) else {
        return fail(SharpefolioError::Universe {
            reason: format!("no snapshot on or before {year}-01-01"),
        });
    };

    eprintln!(
        "Universe for {year} (snapshot {}): {} members",
        snapshot.as_of,
        snapshot.len()
    );
    for ticker in snapshot.tickers() {
        println!(
            "{ticker}\t{}",
            display_name(ticker, &snapshot, universe.fallback_names())
        );
    }
    ExitCode::SUCCESS
}
