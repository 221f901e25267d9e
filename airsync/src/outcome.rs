//! The three-state result channel.
//!
//! A [`SyncOutcome`] tells the caller both what data is available and what
//! happened while trying to refresh it. Previously fetched data is never
//! thrown away because a later refresh failed: it rides along as the
//! fallback of an [`SyncOutcome::Error`].

use crate::error::SyncError;

/// Outcome of one synchronization step.
#[derive(Debug)]
pub enum SyncOutcome<T> {
    /// Fresh data, either served from cache or just fetched.
    Success(T),

    /// A refresh is in flight. Carries the cached value if there is one.
    ///
    /// Never terminal: always followed by `Success` or `Error` for the same cycle.
    StaleOrLoading(Option<T>),

    /// The refresh failed. `fallback` is the last good cached value, if any.
    Error {
        error: SyncError,
        fallback: Option<T>,
    },
}

impl<T> SyncOutcome<T> {
    /// Build an error outcome.
    pub fn error(error: SyncError, fallback: Option<T>) -> Self {
        Self::Error { error, fallback }
    }

    /// The best value this outcome carries, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(v) => Some(v),
            Self::StaleOrLoading(v) => v.as_ref(),
            Self::Error { fallback, .. } => fallback.as_ref(),
        }
    }

    /// Consume the outcome, returning its value if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            Self::StaleOrLoading(v) => v,
            Self::Error { fallback, .. } => fallback,
        }
    }

    /// The error, if this is an `Error` outcome.
    pub fn sync_error(&self) -> Option<&SyncError> {
        match self {
            Self::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns true for `Success` and `Error`, the states that end a cycle.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::StaleOrLoading(_))
    }

    /// Returns true for an error that still carries usable data.
    ///
    /// Callers should show the fallback with a stale indicator instead of a
    /// hard failure.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Error { fallback: Some(_), .. })
    }

    /// Transform the carried value, keeping the state.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SyncOutcome<U> {
        match self {
            Self::Success(v) => SyncOutcome::Success(f(v)),
            Self::StaleOrLoading(v) => SyncOutcome::StaleOrLoading(v.map(f)),
            Self::Error { error, fallback } => SyncOutcome::Error {
                error,
                fallback: fallback.map(f),
            },
        }
    }

    /// Short state label for logs and display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::StaleOrLoading(_) => "loading",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;

    #[test]
    fn test_value_access() {
        assert_eq!(SyncOutcome::Success(3).value(), Some(&3));
        assert_eq!(SyncOutcome::StaleOrLoading(None::<u8>).value(), None);
        let degraded = SyncOutcome::error(SyncError::NoConnectivity, Some(5));
        assert_eq!(degraded.into_value(), Some(5));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SyncOutcome::Success(()).is_terminal());
        assert!(!SyncOutcome::StaleOrLoading(Some(())).is_terminal());
        assert!(SyncOutcome::<()>::error(SyncError::Cancelled, None).is_terminal());
    }

    #[test]
    fn test_degraded_requires_fallback() {
        let hard = SyncOutcome::<u8>::error(SyncError::NoConnectivity, None);
        let soft = SyncOutcome::error(
            SyncError::TransientRemote(RemoteError::Timeout),
            Some(1u8),
        );
        assert!(!hard.is_degraded());
        assert!(soft.is_degraded());
        assert!(soft.is_error());
    }

    #[test]
    fn test_map_keeps_error() {
        let outcome = SyncOutcome::error(SyncError::NoConnectivity, Some(2)).map(|v| v * 10);
        assert_eq!(outcome.value(), Some(&20));
        assert!(matches!(
            outcome.sync_error(),
            Some(SyncError::NoConnectivity)
        ));
        assert_eq!(outcome.label(), "error");
    }
}
