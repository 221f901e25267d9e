//! Cancellable outcome subscription.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::outcome::SyncOutcome;

/// Live stream of outcomes for one key.
///
/// Produced by [`SyncCoordinator::observe`](super::SyncCoordinator::observe).
/// The stream never ends on its own; it ends after [`cancel`](Self::cancel)
/// is called or the stream is dropped. Dropping cancels the background task,
/// interrupting any backoff sleep it is in.
pub struct OutcomeStream<T> {
    rx: mpsc::Receiver<SyncOutcome<T>>,
    token: CancellationToken,
}

impl<T> OutcomeStream<T> {
    pub(crate) fn new(rx: mpsc::Receiver<SyncOutcome<T>>, token: CancellationToken) -> Self {
        Self { rx, token }
    }

    /// Stop the subscription. No further outcomes are delivered.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the next outcome.
    pub async fn recv(&mut self) -> Option<SyncOutcome<T>> {
        if self.token.is_cancelled() {
            return None;
        }
        self.rx.recv().await
    }
}

impl<T> Stream for OutcomeStream<T> {
    type Item = SyncOutcome<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.token.is_cancelled() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for OutcomeStream<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
