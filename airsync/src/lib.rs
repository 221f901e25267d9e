//! airsync - offline-first synchronization for environmental readings
//!
//! This library mediates between a persistent local cache and remote data
//! sources for every externally-sourced entity (air quality, weather,
//! forecasts and similar resources). Callers ask for a key and get back a
//! [`SyncOutcome`] that always preserves the last good value, even when the
//! network is unavailable or the remote source is failing.
//!
//! # Architecture
//!
//! ```text
//! caller ──► SyncCoordinator ──► SyncAdapter::read ──► StalenessPolicy
//!                  │                                        │
//!                  │                          stale ◄───────┘
//!                  ▼
//!          ConnectivityMonitor ──► RetryController ──► SyncAdapter::fetch
//!                                                            │
//!                  SyncOutcome ◄── SyncAdapter::save ◄───────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use airsync::coordinator::SyncCoordinator;
//! use airsync::connectivity::SharedConnectivity;
//! use airsync::key::GeoKey;
//!
//! let coordinator = SyncCoordinator::new(adapter, Arc::new(SharedConnectivity::online()));
//! let outcome = coordinator.get(GeoKey::new(-1.29, 36.82)?).await;
//! if let Some(reading) = outcome.value() {
//!     println!("{reading:?}");
//! }
//! ```

pub mod adapter;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod daemon;
pub mod entity;
pub mod error;
pub mod key;
pub mod logging;
pub mod outcome;
pub mod record;
pub mod remote;
pub mod retry;
pub mod staleness;
pub mod store;

pub use adapter::SyncAdapter;
pub use coordinator::{OutcomeStream, RefreshReport, SyncCoordinator};
pub use error::{ErrorClass, RemoteError, StoreError, SyncError, SyncErrorKind};
pub use key::{FetchKey, GeoKey, LocationKey};
pub use outcome::SyncOutcome;
pub use record::CachedRecord;
