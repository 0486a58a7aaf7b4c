//! Point-in-time investable universe.
//!
//! A [`UniverseSnapshot`] lists the constituents known as of a date. A
//! [`SnapshotBook`] holds every dated snapshot and answers "which members
//! were known on January 1 of year N" with the latest snapshot on or before
//! that day, so later additions never leak backwards.

use crate::domain::error::SharpefolioError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseSnapshot {
    pub as_of: NaiveDate,
    /// Ticker to display name. An empty name means "unknown".
    pub members: BTreeMap<String, String>,
}

impl UniverseSnapshot {
    pub fn new(as_of: NaiveDate, members: BTreeMap<String, String>) -> Self {
        Self { as_of, members }
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.members.contains_key(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn name(&self, ticker: &str) -> Option<&str> {
        self.members
            .get(ticker)
            .map(String::as_str)
            .filter(|n| !n.trim().is_empty())
    }
}

/// Display name lookup in precedence order: the snapshot's own name, then
/// the externally supplied fallback, then the raw ticker.
pub fn display_name(
    ticker: &str,
    snapshot: &UniverseSnapshot,
    fallback: &HashMap<String, String>,
) -> String {
    snapshot
        .name(ticker)
        .or_else(|| {
            fallback
                .get(ticker)
                .map(String::as_str)
                .filter(|n| !n.trim().is_empty())
        })
        .unwrap_or(ticker)
        .to_string()
}

/// A member of one year's universe as reported in results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseMember {
    pub ticker: String,
    pub name: String,
}

/// All dated snapshots, ordered by date.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBook {
    snapshots: BTreeMap<NaiveDate, BTreeMap<String, String>>,
}

impl SnapshotBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `ticker` to the snapshot dated `as_of`, creating it if needed.
    /// A repeated ticker within one snapshot is rejected.
    pub fn insert(
        &mut self,
        as_of: NaiveDate,
        ticker: &str,
        name: &str,
    ) -> Result<(), SharpefolioError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(SharpefolioError::Universe {
                reason: format!("empty ticker in snapshot {as_of}"),
            });
        }
        let members = self.snapshots.entry(as_of).or_default();
        if members.contains_key(ticker) {
            return Err(SharpefolioError::Universe {
                reason: format!("duplicate ticker {ticker} in snapshot {as_of}"),
            });
        }
        members.insert(ticker.to_string(), name.trim().to_string());
        Ok(())
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshot_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.snapshots.keys().copied()
    }

    /// Latest snapshot dated on or before `date`.
    pub fn as_of(&self, date: NaiveDate) -> Option<UniverseSnapshot> {
        self.snapshots
            .range(..=date)
            .next_back()
            .map(|(as_of, members)| UniverseSnapshot::new(*as_of, members.clone()))
    }

    /// Universe known on January 1 of `year`.
    pub fn for_year(&self, year: i32) -> Option<UniverseSnapshot> {
        NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| self.as_of(d))
    }

    /// Every ticker that appears in any snapshot, sorted.
    pub fn all_tickers(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self.snapshots.values().flat_map(|m| m.keys()).collect();
        all.into_iter().cloned().collect()
    }
}
