//! Background reachability probe.
//!
//! Periodically issues a HEAD request to a well-known URL and updates a
//! [`SharedConnectivity`] flag. Any HTTP response counts as online; only a
//! transport failure (DNS, connect, timeout) counts as offline.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::SharedConnectivity;

/// Default probe target.
pub const DEFAULT_PROBE_URL: &str = "https://wttr.in/";

/// Default time between probes.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Shortest interval `run` will tick at.
const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Probe settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub url: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROBE_URL.to_string(),
            interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

impl ProbeConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Keeps a [`SharedConnectivity`] flag in sync with real reachability.
pub struct ConnectivityProbe {
    config: ProbeConfig,
    client: reqwest::Client,
    target: SharedConnectivity,
}

impl ConnectivityProbe {
    /// Create a probe that updates `target`.
    pub fn new(config: ProbeConfig, target: SharedConnectivity) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            client,
            target,
        })
    }

    /// Probe once and update the flag. Returns the new reachability.
    pub async fn probe_once(&self) -> bool {
        let online = match self.client.head(&self.config.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.config.url, error = %e, "Connectivity probe failed");
                false
            }
        };

        let was_online = self.target.set(online);
        if was_online != online {
            info!(online, "Connectivity changed");
        }
        online
    }

    /// Probe on every interval tick until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            url = %self.config.url,
            interval_secs = self.config.interval.as_secs(),
            "Connectivity probe started"
        );

        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_PROBE_INTERVAL));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Connectivity probe shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    self.probe_once().await;
                }
            }
        }
    }
}
