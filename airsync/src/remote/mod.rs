//! Remote data sources.
//!
//! A [`RemoteSource`] exposes one operation: fetch the current value for a
//! key, or fail with a classifiable [`RemoteError`]. Retrying is not its
//! concern; the coordinator wraps every fetch in the retry controller.

mod http;

pub use http::{HttpJsonSource, UrlTemplateKey, DEFAULT_REQUEST_TIMEOUT_SECS};

use crate::error::RemoteError;
use crate::store::BoxFuture;

/// Fetches values for keys from a remote service.
pub trait RemoteSource<K, T>: Send + Sync {
    /// Fetch the current value for `key`.
    fn fetch<'a>(&'a self, key: &'a K) -> BoxFuture<'a, Result<T, RemoteError>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
