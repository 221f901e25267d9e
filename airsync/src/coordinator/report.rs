//! Bulk refresh results.

use std::fmt;

use crate::error::SyncError;
use crate::outcome::SyncOutcome;

/// Per-key outcomes of a bulk refresh.
#[derive(Debug)]
pub struct RefreshReport<K, T> {
    outcomes: Vec<(K, SyncOutcome<T>)>,
}

impl<K, T> RefreshReport<K, T> {
    pub(crate) fn new(outcomes: Vec<(K, SyncOutcome<T>)>) -> Self {
        Self { outcomes }
    }

    /// Number of keys refreshed.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Keys that ended in `Success`.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    /// Keys that ended in `Error`.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_error()).count()
    }

    /// The most severe error across all keys.
    ///
    /// Severity: local storage fault, then permanent remote, then transient
    /// remote, then no connectivity.
    pub fn worst(&self) -> Option<(&K, &SyncError)> {
        self.outcomes
            .iter()
            .filter_map(|(k, o)| o.sync_error().map(|e| (k, e)))
            .max_by_key(|(_, e)| e.kind())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, SyncOutcome<T>)> {
        self.outcomes.iter()
    }

    pub fn into_outcomes(self) -> Vec<(K, SyncOutcome<T>)> {
        self.outcomes
    }
}

impl<K, T> fmt::Display for RefreshReport<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "refreshed {} keys: {} succeeded, {} failed",
            self.len(),
            self.succeeded(),
            self.failed()
        )?;
        if let Some((_, worst)) = self.worst() {
            write!(f, " (worst: {})", worst.kind())?;
        }
        Ok(())
    }
}
