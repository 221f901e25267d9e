//! Staleness policy.
//!
//! Decides whether a cached record is old enough to warrant a refetch. An
//! absent record is always stale; a record exactly `max_age` old is still
//! fresh.

use std::time::Duration;

use crate::record::CachedRecord;

/// Returns true if `record` is absent or older than `max_age` at `now_millis`.
pub fn is_stale<T>(record: Option<&CachedRecord<T>>, max_age: Duration, now_millis: i64) -> bool {
    match record {
        None => true,
        Some(record) => record.age(now_millis) > max_age,
    }
}

/// Per-entity staleness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    max_age: Duration,
}

impl StalenessPolicy {
    /// Create a policy with the given validity window.
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// The validity window.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns true if `record` should be refetched.
    pub fn is_stale<T>(&self, record: Option<&CachedRecord<T>>, now_millis: i64) -> bool {
        is_stale(record, self.max_age, now_millis)
    }
}
