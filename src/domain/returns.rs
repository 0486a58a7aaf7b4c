//! Time-aligned simple daily returns across assets.
//!
//! Prices are placed on the union of every series' dates, converted to
//! period-over-period percentage changes and filtered according to an
//! [`AlignmentPolicy`].

use crate::domain::error::SharpefolioError;
use crate::domain::price::PriceSeries;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How rows with undefined returns are treated when the matrix is built.
/// One policy applies to the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentPolicy {
    /// Keep a row while at least one asset has a return on it. Gaps stay as
    /// `None` and are resolved per training window by the cleaner.
    #[default]
    ColumnWise,
    /// Keep only rows where every asset has a return.
    Intersection,
}

impl AlignmentPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "column_wise" | "columnwise" | "column-wise" => Some(AlignmentPolicy::ColumnWise),
            "intersection" => Some(AlignmentPolicy::Intersection),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlignmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentPolicy::ColumnWise => write!(f, "column_wise"),
            AlignmentPolicy::Intersection => write!(f, "intersection"),
        }
    }
}

/// Asset returns on a shared, strictly increasing date index.
///
/// Every column has exactly `dates.len()` entries; `None` marks a day with
/// no defined return for that asset. Immutable once built, so a single
/// instance can be shared read-only across worker threads.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl ReturnMatrix {
    /// Assembles a matrix from already-aligned columns.
    ///
    /// Fails if the dates are not strictly increasing or a column length does
    /// not match the index.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self, SharpefolioError> {
        if dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SharpefolioError::InsufficientData {
                reason: "return matrix dates must be strictly increasing".into(),
            });
        }
        if let Some((ticker, _)) = columns.iter().find(|(_, col)| col.len() != dates.len()) {
            return Err(SharpefolioError::InsufficientData {
                reason: format!("column {ticker} does not match the date index"),
            });
        }
        Ok(Self { dates, columns })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn asset_count(&self) -> usize {
        self.columns.len()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.columns.contains_key(ticker)
    }

    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.columns.get(ticker).map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.columns.iter().map(|(t, c)| (t.as_str(), c.as_slice()))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Number of defined returns in a column.
    pub fn observations(&self, ticker: &str) -> usize {
        self.columns
            .get(ticker)
            .map(|col| col.iter().filter(|v| v.is_some()).count())
            .unwrap_or(0)
    }

    /// Sub-matrix over `start <= date < end` restricted to `tickers`.
    ///
    /// Tickers absent from the matrix are ignored. Rows where none of the
    /// selected columns has a value are dropped, so an empty result means the
    /// selection carries no data at all.
    pub fn select<'a, I>(&self, start: Option<NaiveDate>, end: NaiveDate, tickers: I) -> ReturnMatrix
    where
        I: IntoIterator<Item = &'a str>,
    {
        let lo = match start {
            Some(s) => self.dates.partition_point(|d| *d < s),
            None => 0,
        };
        let hi = self.dates.partition_point(|d| *d < end);
        let hi = hi.max(lo);

        let chosen: Vec<(&String, &Vec<Option<f64>>)> = tickers
            .into_iter()
            .filter_map(|t| self.columns.get_key_value(t))
            .collect();

        let keep: Vec<usize> = (lo..hi)
            .filter(|&row| chosen.iter().any(|(_, col)| col[row].is_some()))
            .collect();

        let dates = keep.iter().map(|&row| self.dates[row]).collect();
        let columns = chosen
            .into_iter()
            .map(|(ticker, col)| (ticker.clone(), keep.iter().map(|&row| col[row]).collect()))
            .collect();

        ReturnMatrix { dates, columns }
    }

    /// Distinct calendar years present in the index, ascending.
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.dates.iter().map(|d| d.year()).collect();
        years.into_iter().collect()
    }
}

/// Union of every series' dates, ascending.
pub fn build_unified_timeline(series: &[&PriceSeries]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points().iter().map(|p| p.date))
        .collect();
    unique_dates.into_iter().collect()
}

/// Builds the run-wide return matrix from per-asset closes.
///
/// Between an asset's first and last close, a day it did not trade carries
/// its latest close forward, so the gap day returns `0.0` and the next close
/// is measured against the last one actually seen. Rows outside that span are
/// undefined, as is any return whose earlier close is not positive.
/// Fails with `InsufficientData` when no series are supplied.
pub fn build_return_matrix<'a, I>(
    prices: I,
    policy: AlignmentPolicy,
) -> Result<ReturnMatrix, SharpefolioError>
where
    I: IntoIterator<Item = &'a PriceSeries>,
{
    let series: Vec<&PriceSeries> = prices.into_iter().collect();
    if series.is_empty() {
        return Err(SharpefolioError::InsufficientData {
            reason: "no price series supplied".into(),
        });
    }

    let timeline = build_unified_timeline(&series);
    let index: HashMap<NaiveDate, usize> =
        timeline.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut columns: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for s in &series {
        let mut closes: Vec<Option<f64>> = vec![None; timeline.len()];
        for p in s.points() {
            closes[index[&p.date]] = Some(p.close);
        }

        let mut col = vec![None; timeline.len()];
        if let Some((first, last)) = s.date_range() {
            let (lo, hi) = (index[&first], index[&last]);
            let mut prev = closes[lo];
            for row in lo + 1..=hi {
                let curr = closes[row].or(prev);
                if let (Some(p), Some(c)) = (prev, curr) {
                    if p > 0.0 {
                        col[row] = Some(c / p - 1.0);
                    }
                }
                prev = curr;
            }
        }
        columns.insert(s.ticker().to_string(), col);
    }

    let keep: Vec<usize> = (0..timeline.len())
        .filter(|&row| match policy {
            AlignmentPolicy::ColumnWise => columns.values().any(|col| col[row].is_some()),
            AlignmentPolicy::Intersection => columns.values().all(|col| col[row].is_some()),
        })
        .collect();

    let dates = keep.iter().map(|&row| timeline[row]).collect();
    let columns = columns
        .into_iter()
        .map(|(ticker, col)| (ticker, keep.iter().map(|&row| col[row]).collect()))
        .collect();

    Ok(ReturnMatrix { dates, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(ticker: &str, rows: &[(&str, f64)]) -> PriceSeries {
        PriceSeries::new(
            ticker,
            rows.iter()
                .map(|(date, close)| PricePoint {
                    date: d(date),
                    close: *close,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_input_is_insufficient_data() {
        let result = build_return_matrix(Vec::<&PriceSeries>::new(), AlignmentPolicy::ColumnWise);
        assert!(matches!(result, Err(SharpefolioError::InsufficientData { .. })));
    }

    #[test]
    fn simple_percentage_change() {
        let a = series("A", &[("2020-01-06", 100.0), ("2020-01-07", 110.0), ("2020-01-08", 99.0)]);
        let m = build_return_matrix([&a], AlignmentPolicy::ColumnWise).unwrap();

        assert_eq!(m.dates(), &[d("2020-01-07"), d("2020-01-08")]);
        let col = m.column("A").unwrap();
        assert!((col[0].unwrap() - 0.10).abs() < 1e-12);
        assert!((col[1].unwrap() - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn column_wise_keeps_partial_rows() {
        let a = series(
            "A",
            &[("2020-01-06", 100.0), ("2020-01-07", 101.0), ("2020-01-08", 102.0), ("2020-01-09", 103.0)],
        );
        let b = series("B", &[("2020-01-08", 50.0), ("2020-01-09", 51.0)]);
        let m = build_return_matrix([&a, &b], AlignmentPolicy::ColumnWise).unwrap();

        assert_eq!(m.row_count(), 3);
        assert_eq!(m.column("B").unwrap(), &[None, None, Some(51.0 / 50.0 - 1.0)]);
        assert_eq!(m.observations("A"), 3);
        assert_eq!(m.observations("B"), 1);
    }

    #[test]
    fn intersection_drops_partial_rows() {
        let a = series(
            "A",
            &[("2020-01-06", 100.0), ("2020-01-07", 101.0), ("2020-01-08", 102.0), ("2020-01-09", 103.0)],
        );
        let b = series("B", &[("2020-01-08", 50.0), ("2020-01-09", 51.0)]);
        let m = build_return_matrix([&a, &b], AlignmentPolicy::Intersection).unwrap();

        assert_eq!(m.dates(), &[d("2020-01-09")]);
        assert!(m.columns().all(|(_, col)| col.iter().all(Option::is_some)));
    }

    #[test]
    fn gap_in_one_series_carries_its_last_close() {
        let a = series("A", &[("2020-01-06", 100.0), ("2020-01-07", 100.0), ("2020-01-08", 100.0)]);
        let b = series("B", &[("2020-01-06", 10.0), ("2020-01-08", 11.0)]);
        let m = build_return_matrix([&a, &b], AlignmentPolicy::ColumnWise).unwrap();

        let col = m.column("B").unwrap();
        assert_eq!(col[0], Some(0.0));
        assert!((col[1].unwrap() - 0.10).abs() < 1e-12);

        let dense = build_return_matrix([&a, &b], AlignmentPolicy::Intersection).unwrap();
        assert_eq!(dense.row_count(), 2);
    }

    #[test]
    fn no_returns_after_last_close() {
        let a = series("A", &[("2020-01-06", 100.0), ("2020-01-07", 101.0), ("2020-01-08", 102.0)]);
        let b = series("B", &[("2020-01-06", 10.0), ("2020-01-07", 11.0)]);
        let m = build_return_matrix([&a, &b], AlignmentPolicy::ColumnWise).unwrap();

        let col = m.column("B").unwrap();
        assert!((col[0].unwrap() - 0.10).abs() < 1e-12);
        assert_eq!(col[1], None);
    }

    #[test]
    fn non_positive_previous_close_is_undefined() {
        let a = series("A", &[("2020-01-06", 0.0), ("2020-01-07", 1.0), ("2020-01-08", 2.0)]);
        let m = build_return_matrix([&a], AlignmentPolicy::ColumnWise).unwrap();
        assert_eq!(m.dates(), &[d("2020-01-08")]);
    }

    #[test]
    fn select_restricts_rows_and_columns() {
        let a = series(
            "A",
            &[("2019-12-30", 1.0), ("2019-12-31", 1.1), ("2020-01-02", 1.2), ("2020-01-03", 1.3)],
        );
        let b = series(
            "B",
            &[("2019-12-30", 2.0), ("2019-12-31", 2.2), ("2020-01-02", 2.4), ("2020-01-03", 2.6)],
        );
        let m = build_return_matrix([&a, &b], AlignmentPolicy::ColumnWise).unwrap();

        let before = m.select(None, d("2020-01-01"), ["A"]);
        assert_eq!(before.dates(), &[d("2019-12-31")]);
        assert_eq!(before.asset_count(), 1);

        let after = m.select(Some(d("2020-01-01")), d("2021-01-01"), ["B", "MISSING"]);
        assert_eq!(after.dates(), &[d("2020-01-02"), d("2020-01-03")]);
        assert!(after.contains("B"));
        assert!(!after.contains("MISSING"));
    }

    #[test]
    fn select_drops_rows_without_selected_data() {
        let a = series("A", &[("2020-01-06", 1.0), ("2020-01-07", 1.1), ("2020-01-08", 1.2)]);
        let b = series("B", &[("2020-01-07", 5.0), ("2020-01-08", 5.5)]);
        let m = build_return_matrix([&a, &b], AlignmentPolicy::ColumnWise).unwrap();

        let only_b = m.select(None, d("2021-01-01"), ["B"]);
        assert_eq!(only_b.dates(), &[d("2020-01-08")]);
    }

    #[test]
    fn years_lists_distinct_calendar_years() {
        let a = series(
            "A",
            &[("2019-12-30", 1.0), ("2019-12-31", 1.1), ("2020-01-02", 1.2), ("2021-01-04", 1.3)],
        );
        let m = build_return_matrix([&a], AlignmentPolicy::ColumnWise).unwrap();
        assert_eq!(m.years(), vec![2019, 2020, 2021]);
    }

    #[test]
    fn from_columns_validates_shape() {
        let mut cols = BTreeMap::new();
        cols.insert("A".to_string(), vec![Some(0.01)]);
        let result = ReturnMatrix::from_columns(vec![d("2020-01-06"), d("2020-01-07")], cols);
        assert!(result.is_err());
    }

    #[test]
    fn alignment_policy_parse() {
        assert_eq!(AlignmentPolicy::parse("column_wise"), Some(AlignmentPolicy::ColumnWise));
        assert_eq!(AlignmentPolicy::parse(" Intersection "), Some(AlignmentPolicy::Intersection));
        assert_eq!(AlignmentPolicy::parse("outer"), None);
    }
}
