//! Cached records.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::staleness;

/// A value plus the time it was fetched from the remote source.
///
/// Records are always replaced wholesale; there is no partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord<T> {
    /// The cached value.
    pub value: T,
    /// When the value was fetched, in Unix epoch milliseconds.
    pub fetched_at_millis: i64,
}

impl<T> CachedRecord<T> {
    /// Create a record fetched at the given time.
    pub fn new(value: T, fetched_at_millis: i64) -> Self {
        Self {
            value,
            fetched_at_millis,
        }
    }

    /// Age of the record at `now_millis`. Future timestamps count as zero.
    pub fn age(&self, now_millis: i64) -> Duration {
        Duration::from_millis(now_millis.saturating_sub(self.fetched_at_millis).max(0) as u64)
    }

    /// Returns true if the record is older than `max_age`.
    pub fn is_stale(&self, max_age: Duration, now_millis: i64) -> bool {
        staleness::is_stale(Some(self), max_age, now_millis)
    }

    /// Transform the value, keeping the timestamp.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CachedRecord<U> {
        CachedRecord {
            value: f(self.value),
            fetched_at_millis: self.fetched_at_millis,
        }
    }
}
