//! JSON file-backed record store.
//!
//! The whole table lives in memory (a [`MemoryStore`]) and is written back
//! to a single JSON file after every mutation. Writes go to a temporary file
//! which is then renamed over the table, so a crash mid-write leaves the
//! previous table intact.
//!
//! File layout: a JSON object mapping each key's `Display` form to its
//! record.
//!
//! ```json
//! {
//!   "-1.29,36.82": { "value": { ... }, "fetched_at_millis": 1718000000000 }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::key::FetchKey;
use crate::record::CachedRecord;
use crate::store::memory::MemoryStore;
use crate::store::traits::{BoxFuture, RecordStore};

/// Suffix of the temporary file used for atomic replacement.
const TEMP_SUFFIX: &str = "tmp";

/// Entity table persisted as a JSON file.
pub struct JsonFileStore<K: FetchKey, T> {
    path: PathBuf,
    memory: MemoryStore<K, T>,
    /// Serializes mutations so the file always matches some in-memory state.
    write_lock: Mutex<()>,
}

impl<K, T> JsonFileStore<K, T>
where
    K: FetchKey + FromStr,
    <K as FromStr>::Err: fmt::Display,
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Open the table at `path`, loading existing records.
    ///
    /// A missing file is an empty table. The parent directory is created on
    /// first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_table::<K, T>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), records = records.len(), "Opened record table");

        Ok(Self {
            path,
            memory: MemoryStore::with_records(records),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the newest record within ±`tolerance_deg` of `key`.
    pub fn nearest(&self, key: &K, tolerance_deg: f64) -> Option<(K, CachedRecord<T>)> {
        self.memory.nearest(key, tolerance_deg)
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    async fn persist(&self, records: &[(K, CachedRecord<T>)]) -> Result<(), StoreError> {
        let table: BTreeMap<String, &CachedRecord<T>> =
            records.iter().map(|(k, r)| (k.to_string(), r)).collect();
        let bytes = serde_json::to_vec_pretty(&table)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let temp = self.path.with_extension(TEMP_SUFFIX);
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), records = records.len(), "Persisted record table");
        Ok(())
    }

    async fn upsert_inner(&self, key: K, record: CachedRecord<T>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut next = self.memory.snapshot();
        next.retain(|(k, _)| *k != key);
        next.push((key.clone(), record.clone()));
        self.persist(&next).await?;

        self.memory.put(key, record);
        Ok(())
    }

    async fn delete_older_than_inner(&self, cutoff_millis: i64) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;

        let current = self.memory.snapshot();
        let before = current.len();
        let next: Vec<_> = current
            .into_iter()
            .filter(|(_, r)| r.fetched_at_millis >= cutoff_millis)
            .collect();
        let removed = before - next.len();
        if removed == 0 {
            return Ok(0);
        }

        self.persist(&next).await?;
        Ok(self.memory.remove_older_than(cutoff_millis).len())
    }

    async fn clear_inner(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.persist(&[]).await?;
        self.memory.remove_all();
        Ok(())
    }
}

fn decode_table<K, T>(bytes: &[u8]) -> Result<Vec<(K, CachedRecord<T>)>, StoreError>
where
    K: FromStr,
    <K as FromStr>::Err: fmt::Display,
    T: DeserializeOwned,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let table: BTreeMap<String, CachedRecord<T>> = serde_json::from_slice(bytes)?;
    table
        .into_iter()
        .map(|(raw, record)| {
            let key = raw.parse::<K>().map_err(|e| StoreError::Corrupt {
                key: raw.clone(),
                reason: e.to_string(),
            })?;
            Ok((key, record))
        })
        .collect()
}

impl<K, T> RecordStore<K, T> for JsonFileStore<K, T>
where
    K: FetchKey + FromStr,
    <K as FromStr>::Err: fmt::Display,
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn read<'a>(&'a self, key: &'a K) -> BoxFuture<'a, Result<Option<CachedRecord<T>>, StoreError>> {
        Box::pin(async move { Ok(self.memory.get(key)) })
    }

    fn read_near<'a>(
        &'a self,
        key: &'a K,
        tolerance_deg: f64,
    ) -> BoxFuture<'a, Result<Option<CachedRecord<T>>, StoreError>> {
        Box::pin(async move { Ok(self.memory.nearest(key, tolerance_deg).map(|(_, r)| r)) })
    }

    fn upsert(&self, key: K, record: CachedRecord<T>) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(self.upsert_inner(key, record))
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<K>, StoreError>> {
        Box::pin(async move { Ok(self.memory.key_list()) })
    }

    fn latest(&self) -> BoxFuture<'_, Result<Option<(K, CachedRecord<T>)>, StoreError>> {
        Box::pin(async move { Ok(self.memory.newest()) })
    }

    fn delete_older_than(&self, cutoff_millis: i64) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(self.delete_older_than_inner(cutoff_millis))
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(self.clear_inner())
    }

    fn subscribe(&self, key: &K) -> watch::Receiver<u64> {
        self.memory.watch(key)
    }
}
