//! Dense training matrix for mean / covariance estimation.

use crate::domain::returns::ReturnMatrix;
use chrono::NaiveDate;
use nalgebra::DMatrix;

/// Fully observed training data: `returns` is rows = dates, columns = assets,
/// in the order of `assets`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTraining {
    pub assets: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub returns: DMatrix<f64>,
}

impl CleanedTraining {
    pub fn observations(&self) -> usize {
        self.dates.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.assets.is_empty()
    }
}

/// Drops assets with no observations, then drops every row that is missing
/// a value for any remaining asset.
pub fn clean_training(training: &ReturnMatrix) -> CleanedTraining {
    let kept: Vec<(&str, &[Option<f64>])> = training
        .columns()
        .filter(|(_, col)| col.iter().any(Option::is_some))
        .collect();

    let rows: Vec<usize> = if kept.is_empty() {
        Vec::new()
    } else {
        (0..training.row_count())
            .filter(|&row| kept.iter().all(|(_, col)| col[row].is_some()))
            .collect()
    };

    let returns = DMatrix::from_fn(rows.len(), kept.len(), |i, j| {
        kept[j].1[rows[i]].unwrap_or(0.0)
    });

    CleanedTraining {
        assets: kept.iter().map(|(t, _)| t.to_string()).collect(),
        dates: rows.iter().map(|&row| training.dates()[row]).collect(),
        returns,
    }
}
