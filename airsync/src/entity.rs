//! Entity types and the generic store+source adapter.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::adapter::SyncAdapter;
use crate::error::{ErrorClass, RemoteError, StoreError};
use crate::key::FetchKey;
use crate::record::CachedRecord;
use crate::remote::RemoteSource;
use crate::store::{BoxFuture, RecordStore, DEFAULT_PROXIMITY_DEG};

/// Externally-sourced entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Live air-quality readings.
    AirQuality,
    /// Current weather.
    Weather,
    /// Multi-day weather forecast.
    Forecast,
    /// Other resources with the same shape.
    Extras,
}

impl EntityKind {
    /// Every kind, in display order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::AirQuality,
        EntityKind::Weather,
        EntityKind::Forecast,
        EntityKind::Extras,
    ];

    /// Default freshness window.
    pub fn default_max_age(&self) -> Duration {
        match self {
            EntityKind::AirQuality | EntityKind::Weather | EntityKind::Extras => {
                Duration::from_secs(30 * 60)
            }
            EntityKind::Forecast => Duration::from_secs(3 * 60 * 60),
        }
    }

    /// Bounding-box half-width used to answer reads from nearby records.
    ///
    /// Location-based readings use ±0.1°; other kinds match their key exactly.
    pub fn default_proximity(&self) -> Option<f64> {
        match self {
            EntityKind::AirQuality | EntityKind::Weather => Some(DEFAULT_PROXIMITY_DEG),
            EntityKind::Forecast | EntityKind::Extras => None,
        }
    }

    /// Name of the entity's table (also its file stem).
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::AirQuality => "air_quality",
            EntityKind::Weather => "weather",
            EntityKind::Forecast => "forecast",
            EntityKind::Extras => "extras",
        }
    }

    /// Short name for display and command lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::AirQuality => "air-quality",
            EntityKind::Weather => "weather",
            EntityKind::Forecast => "forecast",
            EntityKind::Extras => "extras",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "air-quality" | "aq" => Ok(EntityKind::AirQuality),
            "weather" => Ok(EntityKind::Weather),
            "forecast" => Ok(EntityKind::Forecast),
            "extras" => Ok(EntityKind::Extras),
            other => Err(format!("unknown entity '{}'", other)),
        }
    }
}

type Classifier = Arc<dyn Fn(&RemoteError) -> ErrorClass + Send + Sync>;

/// Adapter built from a record store and a remote source.
///
/// Clones share the same store and source.
pub struct EntityAdapter<K, T> {
    name: String,
    max_age: Duration,
    store: Arc<dyn RecordStore<K, T>>,
    source: Arc<dyn RemoteSource<K, T>>,
    classifier: Option<Classifier>,
    /// Bounding-box half-width for reads; `None` reads the exact key.
    proximity_deg: Option<f64>,
}

impl<K, T> Clone for EntityAdapter<K, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            max_age: self.max_age,
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            classifier: self.classifier.clone(),
            proximity_deg: self.proximity_deg,
        }
    }
}

impl<K, T> EntityAdapter<K, T> {
    /// Create an adapter for `kind` using its default max age.
    pub fn for_kind(
        kind: EntityKind,
        store: Arc<dyn RecordStore<K, T>>,
        source: Arc<dyn RemoteSource<K, T>>,
    ) -> Self {
        Self::new(kind.as_str(), kind.default_max_age(), store, source)
    }

    pub fn new(
        name: impl Into<String>,
        max_age: Duration,
        store: Arc<dyn RecordStore<K, T>>,
        source: Arc<dyn RemoteSource<K, T>>,
    ) -> Self {
        Self {
            name: name.into(),
            max_age,
            store,
            source,
            classifier: None,
            proximity_deg: None,
        }
    }

    /// Override the freshness window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Answer reads with the newest record within ±`tolerance_deg` of the
    /// requested key instead of the exact key only.
    ///
    /// Fetched values are still saved under the requested key.
    pub fn with_proximity(mut self, tolerance_deg: f64) -> Self {
        self.proximity_deg = Some(tolerance_deg);
        self
    }

    /// Override remote error classification.
    pub fn with_classifier(
        mut self,
        classifier: impl Fn(&RemoteError) -> ErrorClass + Send + Sync + 'static,
    ) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn RecordStore<K, T>> {
        &self.store
    }
}

impl<K, T> SyncAdapter for EntityAdapter<K, T>
where
    K: FetchKey,
    T: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn max_age(&self) -> Duration {
        self.max_age
    }

    fn read<'a>(&'a self, key: &'a K) -> BoxFuture<'a, Result<Option<CachedRecord<T>>, StoreError>> {
        match self.proximity_deg {
            Some(tolerance) => self.store.read_near(key, tolerance),
            None => self.store.read(key),
        }
    }

    fn fetch<'a>(&'a self, key: &'a K) -> BoxFuture<'a, Result<T, RemoteError>> {
        self.source.fetch(key)
    }

    fn save<'a>(
        &'a self,
        key: &'a K,
        value: T,
        fetched_at_millis: i64,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.store
            .upsert(key.clone(), CachedRecord::new(value, fetched_at_millis))
    }

    fn classify(&self, error: &RemoteError) -> ErrorClass {
        match &self.classifier {
            Some(classify) => classify(error),
            None => error.class(),
        }
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<K>, StoreError>> {
        self.store.keys()
    }

    fn delete_older_than(&self, cutoff_millis: i64) -> BoxFuture<'_, Result<usize, StoreError>> {
        self.store.delete_older_than(cutoff_millis)
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        self.store.clear()
    }

    fn changes(&self, key: &K) -> Option<watch::Receiver<u64>> {
        Some(self.store.subscribe(key))
    }
}
