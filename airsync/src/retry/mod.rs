//! Retry with exponential backoff.
//!
//! - [`RetryPolicy`]: how many attempts and how long to wait between them
//! - [`RetryController`]: runs an async operation under a policy, aborting
//!   early on permanent failures and waking promptly on cancellation

mod controller;
mod policy;

pub use controller::{RetryController, RetryError};
pub use policy::{
    RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_SECS,
};
