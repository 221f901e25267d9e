//! Network reachability.
//!
//! The coordinator asks a [`ConnectivityMonitor`] once per fetch decision
//! whether the network is reachable. It never polls mid-fetch. When the
//! answer is "no", the fetch is skipped entirely and no retry attempt is
//! consumed.
//!
//! # Implementors
//!
//! - [`SharedConnectivity`]: a flag updated by a platform callback or by the
//!   [`ConnectivityProbe`] background task
//! - [`AlwaysOnline`] / [`AlwaysOffline`]: fixed answers for tests

mod probe;

pub use probe::{
    ConnectivityProbe, ProbeConfig, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_PROBE_TIMEOUT_SECS,
    DEFAULT_PROBE_URL,
};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reachability as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    /// Get a short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::Online => "online",
            ConnectivityState::Offline => "offline",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, ConnectivityState::Online)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reports whether the network is reachable.
///
/// Queried synchronously, so implementations should answer from cached
/// state rather than performing I/O.
pub trait ConnectivityMonitor: Send + Sync {
    /// Check whether a remote fetch may be attempted now.
    fn is_available(&self) -> bool;

    /// Current state for display and logging.
    fn state(&self) -> ConnectivityState {
        if self.is_available() {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        }
    }
}

/// Shared reachability flag.
///
/// Clones share the same flag, so one handle can be given to the coordinator
/// while another is updated by whatever watches the network.
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    online: Arc<AtomicBool>,
}

impl SharedConnectivity {
    /// Start in the online state.
    pub fn online() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Start in the offline state.
    pub fn offline() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Update reachability. Returns the previous value.
    pub fn set(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::online()
    }
}

impl ConnectivityMonitor for SharedConnectivity {
    fn is_available(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Testing monitor that always reports the network as reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

impl ConnectivityMonitor for AlwaysOnline {
    fn is_available(&self) -> bool {
        true
    }
}

/// Testing monitor that always reports the network as unreachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOffline;

impl ConnectivityMonitor for AlwaysOffline {
    fn is_available(&self) -> bool {
        false
    }
}
