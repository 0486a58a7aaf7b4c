//! CLI integration tests for the study command orchestration.
//!
//! Tests cover:
//! - Config parsing (build_study_config, build_report_settings)
//! - Dry-run mode with real INI files on disk
//! - Full pipeline with MockDataPort and a temporary output directory
//! - End-to-end `run` with CSV prices and universe files on disk

mod common;

use clap::Parser;
use common::*;
use sharpefolio::adapters::csv_report_adapter::{SUMMARY_FILE, weights_file_name};
use sharpefolio::adapters::file_config_adapter::FileConfigAdapter;
use sharpefolio::adapters::markdown_report::REPORT_FILE;
use sharpefolio::cli::{self, Cli, DEFAULT_OUTPUT_DIR, DEFAULT_TOP_HOLDINGS, ReportSettings};
use sharpefolio::domain::error::SharpefolioError;
use sharpefolio::domain::returns::AlignmentPolicy;
use sharpefolio::domain::window::Lookback;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[data]
prices_dir = data/prices
universe_file = data/universe.csv

[portfolio]
max_weight = 0.25
lookback_days = 504
min_training_observations = 60
trading_days_per_year = 250
alignment = intersection
start_year = 2013
end_year = 2020

[solver]
max_iterations = 500
tolerance = 1e-8
time_limit_ms = 1500

[report]
output_dir = out/study
split_year = 2016
top_holdings = 5
"#;

const MINIMAL_INI: &str = r#"
[data]
prices_dir = data/prices
universe_file = data/universe.csv

[portfolio]
start_year = 2015
end_year = 2018
"#;

fn report_to(dir: &Path) -> ReportSettings {
    ReportSettings {
        output_dir: dir.to_path_buf(),
        split_year: None,
        top_holdings: 3,
        template_path: None,
    }
}

mod study_config {
    use super::*;

    #[test]
    fn reads_every_key() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let study = cli::build_study_config(&adapter).unwrap();

        assert_eq!(study.max_weight, 0.25);
        assert_eq!(study.lookback, Lookback::Days(504));
        assert_eq!(study.min_training_observations, 60);
        assert_eq!(study.trading_days_per_year, 250);
        assert_eq!(study.alignment, AlignmentPolicy::Intersection);
        assert_eq!((study.start_year, study.end_year), (2013, 2020));
        assert_eq!(study.solver.max_iterations, 500);
        assert_eq!(study.solver.tolerance, 1e-8);
        assert_eq!(study.solver.time_limit, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn defaults_when_keys_absent() {
        let adapter = FileConfigAdapter::from_string(MINIMAL_INI).unwrap();
        let study = cli::build_study_config(&adapter).unwrap();

        assert_eq!(study.max_weight, 0.2);
        assert_eq!(study.lookback, Lookback::Days(252));
        assert_eq!(study.min_training_observations, 120);
        assert_eq!(study.trading_days_per_year, 252);
        assert_eq!(study.alignment, AlignmentPolicy::ColumnWise);
        assert_eq!(study.solver.time_limit, None);
        assert_eq!(study.years().count(), 4);
    }

    #[test]
    fn zero_time_limit_means_unbounded() {
        let adapter = FileConfigAdapter::from_string(&format!(
            "{MINIMAL_INI}\n[solver]\ntime_limit_ms = 0\n"
        ))
        .unwrap();
        let study = cli::build_study_config(&adapter).unwrap();
        assert_eq!(study.solver.time_limit, None);
    }

    #[test]
    fn all_history_lookback() {
        let ini = MINIMAL_INI.replace("end_year = 2018", "end_year = 2018\nlookback_days = all");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let study = cli::build_study_config(&adapter).unwrap();
        assert_eq!(study.lookback, Lookback::AllHistory);
    }

    #[test]
    fn missing_start_year_is_reported() {
        let ini = MINIMAL_INI.replace("start_year = 2015\n", "");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let err = cli::build_study_config(&adapter).unwrap_err();
        assert!(
            matches!(err, SharpefolioError::ConfigMissing { ref key, .. } if key == "start_year")
        );
    }

    #[test]
    fn invalid_lookback_is_rejected() {
        let ini = MINIMAL_INI.replace("end_year = 2018", "end_year = 2018\nlookback_days = soon");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let err = cli::build_study_config(&adapter).unwrap_err();
        assert!(
            matches!(err, SharpefolioError::ConfigInvalid { ref key, .. } if key == "lookback_days")
        );
    }
}

mod report_settings {
    use super::*;

    #[test]
    fn reads_report_section() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let report = cli::build_report_settings(&adapter);
        assert_eq!(report.output_dir, PathBuf::from("out/study"));
        assert_eq!(report.split_year, Some(2016));
        assert_eq!(report.top_holdings, 5);
        assert_eq!(report.template_path, None);
    }

    #[test]
    fn defaults() {
        let adapter = FileConfigAdapter::from_string(MINIMAL_INI).unwrap();
        let report = cli::build_report_settings(&adapter);
        assert_eq!(report.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(report.split_year, None);
        assert_eq!(report.top_holdings, DEFAULT_TOP_HOLDINGS);
    }
}

mod dry_run {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let file = write_temp_ini(VALID_INI);
        assert!(exit_code_is(cli::run_dry_run(file.path()), 0));
    }

    #[test]
    fn missing_file_is_config_error() {
        let code = cli::run_dry_run(Path::new("/nonexistent/study.ini"));
        assert!(exit_code_is(code, 2));
    }

    #[test]
    fn out_of_range_max_weight_is_config_error() {
        let file = write_temp_ini(&VALID_INI.replace("max_weight = 0.25", "max_weight = 1.5"));
        assert!(exit_code_is(cli::run_dry_run(file.path()), 2));
    }

    #[test]
    fn reversed_years_are_config_error() {
        let file = write_temp_ini(&VALID_INI.replace("end_year = 2020", "end_year = 2010"));
        assert!(exit_code_is(cli::run_dry_run(file.path()), 2));
    }

    #[test]
    fn missing_data_section_is_config_error() {
        let ini = VALID_INI.replace("prices_dir = data/prices\n", "");
        let file = write_temp_ini(&ini);
        assert!(exit_code_is(cli::run_dry_run(file.path()), 2));
    }
}

mod pipeline {
    use super::*;

    fn market() -> MockDataPort {
        MockDataPort::new()
            .with_series(series_between("AAA", date(2017, 1, 1), date(2020, 12, 31), 0))
            .with_series(series_between("BBB", date(2017, 1, 1), date(2020, 12, 31), 1))
            .with_series(series_between("CCC", date(2017, 1, 1), date(2020, 12, 31), 2))
    }

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn writes_csv_and_markdown_reports() {
        let dir = TempDir::new().unwrap();
        let port = market();
        let resolver = MockResolver::new().with_years(2018..=2020, &["AAA", "BBB", "CCC"]);
        let study = sample_study(2018, 2020);

        let code = cli::run_study_pipeline(
            &port,
            &resolver,
            &tickers(&["AAA", "BBB", "CCC"]),
            &HashMap::new(),
            &study,
            &report_to(dir.path()),
        );

        assert!(exit_code_is(code, 0));
        let summary = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary.lines().count(), 4);
        assert!(summary.lines().nth(1).unwrap().starts_with("2018,"));
        for year in 2018..=2020 {
            assert!(dir.path().join(weights_file_name(year)).exists());
        }
        let report = fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
        assert!(report.contains("2018"));
        assert!(report.contains("2020"));
        assert!(!report.contains("{{"));
    }

    #[test]
    fn empty_outcome_writes_csv_only() {
        let dir = TempDir::new().unwrap();
        let port = market();
        let resolver = MockResolver::new();
        let study = sample_study(2018, 2019);

        let code = cli::run_study_pipeline(
            &port,
            &resolver,
            &tickers(&["AAA", "BBB"]),
            &HashMap::new(),
            &study,
            &report_to(dir.path()),
        );

        assert!(exit_code_is(code, 0));
        let summary = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("skipped: no universe"));
        assert!(!dir.path().join(REPORT_FILE).exists());
    }

    #[test]
    fn no_price_data_exits_insufficient_data() {
        let dir = TempDir::new().unwrap();
        let port = MockDataPort::new().with_error("AAA", "corrupt");
        let resolver = MockResolver::new().with_year(2019, &["AAA"]);

        let code = cli::run_study_pipeline(
            &port,
            &resolver,
            &tickers(&["AAA", "MISSING"]),
            &HashMap::new(),
            &sample_study(2019, 2019),
            &report_to(dir.path()),
        );

        assert!(exit_code_is(code, 5));
        assert!(!dir.path().join(SUMMARY_FILE).exists());
    }

    #[test]
    fn failing_tickers_are_skipped() {
        let port = market().with_error("BAD", "bad close value");
        let resolver = MockResolver::new().with_year(2019, &["AAA", "BBB", "BAD"]);

        let outcome = cli::execute_study(
            &port,
            &resolver,
            &tickers(&["AAA", "BAD", "BBB"]),
            &HashMap::new(),
            &sample_study(2019, 2019),
        )
        .unwrap();

        let weights = &outcome.results[&2019].weights;
        assert_eq!(weights.len(), 2);
        assert!(!weights.contains("BAD"));
    }

    #[test]
    fn custom_template_is_used() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("template.md");
        fs::write(&template, "# Custom {{YEAR_RANGE}}\n").unwrap();
        let out = dir.path().join("out");
        let report = ReportSettings {
            template_path: Some(template),
            ..report_to(&out)
        };

        let code = cli::run_study_pipeline(
            &market(),
            &MockResolver::new().with_year(2019, &["AAA", "BBB"]),
            &tickers(&["AAA", "BBB"]),
            &HashMap::new(),
            &sample_study(2019, 2019),
            &report,
        );

        assert!(exit_code_is(code, 0));
        let text = fs::read_to_string(out.join(REPORT_FILE)).unwrap();
        assert!(text.starts_with("# Custom 2019"));
    }

    #[test]
    fn missing_template_is_report_error() {
        let dir = TempDir::new().unwrap();
        let report = ReportSettings {
            template_path: Some(dir.path().join("nope.md")),
            ..report_to(dir.path())
        };

        let code = cli::run_study_pipeline(
            &market(),
            &MockResolver::new().with_year(2019, &["AAA", "BBB"]),
            &tickers(&["AAA", "BBB"]),
            &HashMap::new(),
            &sample_study(2019, 2019),
            &report,
        );
        assert!(!exit_code_is(code, 0));
    }
}

mod end_to_end {
    use super::*;

    fn write_prices(dir: &Path, ticker: &str, seed: usize) {
        let series = series_between(ticker, date(2016, 1, 1), date(2019, 12, 31), seed);
        let mut text = String::from("timestamp,close\n");
        for p in series.points() {
            text.push_str(&format!("{},{}\n", p.date, p.close));
        }
        fs::write(dir.join(format!("{ticker}.csv")), text).unwrap();
    }

    fn workspace() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let prices = dir.path().join("prices");
        fs::create_dir(&prices).unwrap();
        for (i, t) in ["7203.T", "6758.T", "9984.T", "8306.T"].iter().enumerate() {
            write_prices(&prices, t, i);
        }
        fs::write(
            dir.path().join("universe.csv"),
            "as_of,ticker,name\n\
             2016-06-01,7203.T,Toyota\n\
             2016-06-01,6758.T,Sony\n\
             2016-06-01,9984.T,\n\
             2018-06-01,7203.T,Toyota\n\
             2018-06-01,6758.T,Sony\n\
             2018-06-01,9984.T,\n\
             2018-06-01,8306.T,MUFG\n",
        )
        .unwrap();
        fs::write(dir.path().join("names.csv"), "ticker,name\n9984.T,SoftBank\n").unwrap();

        let ini = format!(
            "[data]\nprices_dir = {}\nuniverse_file = {}\nnames_file = {}\n\n\
             [portfolio]\nmax_weight = 0.4\nmin_training_observations = 100\n\
             start_year = 2017\nend_year = 2019\n\n[report]\noutput_dir = {}\n",
            prices.display(),
            dir.path().join("universe.csv").display(),
            dir.path().join("names.csv").display(),
            dir.path().join("reports").display(),
        );
        let config = dir.path().join("study.ini");
        fs::write(&config, ini).unwrap();
        (dir, config)
    }

    #[test]
    fn run_command_writes_reports() {
        let (dir, config) = workspace();
        let args = Cli::try_parse_from(["sharpefolio", "run", "-c", config.to_str().unwrap()]).unwrap();

        assert!(exit_code_is(cli::run(args), 0));
        let reports = dir.path().join("reports");
        let summary = fs::read_to_string(reports.join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary.lines().count(), 4);

        // 2017 and 2018 use the three-member 2016 snapshot.
        let weights_2018 = fs::read_to_string(reports.join(weights_file_name(2018))).unwrap();
        assert!(weights_2018.contains("9984.T,SoftBank,"));
        assert!(!weights_2018.contains("8306.T"));
        let weights_2019 = fs::read_to_string(reports.join(weights_file_name(2019))).unwrap();
        assert!(weights_2019.contains("8306.T,MUFG,"));
        assert!(reports.join(REPORT_FILE).exists());
    }

    #[test]
    fn year_overrides_and_output_flag() {
        let (dir, config) = workspace();
        let out = dir.path().join("override");
        let args = Cli::try_parse_from([
            "sharpefolio",
            "run",
            "--config",
            config.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--start-year",
            "2019",
        ])
        .unwrap();

        assert!(exit_code_is(cli::run(args), 0));
        let summary = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary.lines().count(), 2);
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn override_past_end_year_is_config_error() {
        let (_dir, config) = workspace();
        let args = Cli::try_parse_from([
            "sharpefolio",
            "run",
            "-c",
            config.to_str().unwrap(),
            "--start-year",
            "2025",
        ])
        .unwrap();
        assert!(exit_code_is(cli::run(args), 2));
    }

    #[test]
    fn validate_info_and_universe_commands() {
        let (_dir, config) = workspace();
        let path = config.to_str().unwrap();

        let validate = Cli::try_parse_from(["sharpefolio", "validate", "-c", path]).unwrap();
        assert!(exit_code_is(cli::run(validate), 0));

        let info = Cli::try_parse_from(["sharpefolio", "info", "-c", path, "--ticker", "7203.T"])
            .unwrap();
        assert!(exit_code_is(cli::run(info), 0));

        let universe =
            Cli::try_parse_from(["sharpefolio", "universe", "-c", path, "--year", "2019"]).unwrap();
        assert!(exit_code_is(cli::run(universe), 0));

        let too_early =
            Cli::try_parse_from(["sharpefolio", "universe", "-c", path, "--year", "2015"]).unwrap();
        assert!(exit_code_is(cli::run(too_early), 3));
    }
}
