//! Point-in-time universe lookup port.

use crate::domain::universe::{SnapshotBook, UniverseSnapshot};

/// Resolves the investable universe known on January 1 of a year.
///
/// Constructed once per run and shared by reference across worker threads.
/// `None` means no universe is known for that year.
pub trait UniverseResolver: Send + Sync {
    fn universe_for_year(&self, year: i32) -> Option<UniverseSnapshot>;
}

impl<F> UniverseResolver for F
where
    F: Fn(i32) -> Option<UniverseSnapshot> + Send + Sync,
{
    fn universe_for_year(&self, year: i32) -> Option<UniverseSnapshot> {
        self(year)
    }
}

impl UniverseResolver for SnapshotBook {
    fn universe_for_year(&self, year: i32) -> Option<UniverseSnapshot> {
        self.for_year(year)
    }
}
