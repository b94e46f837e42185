//! Background task plumbing shared by both producer variants

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::stats::RouterStats;

/// Keeps the active-producer gauge raised while alive
struct ActiveProducer(Arc<RouterStats>);

impl ActiveProducer {
    fn new(stats: Arc<RouterStats>) -> Self {
        stats.producer_started();
        Self(stats)
    }
}

impl Drop for ActiveProducer {
    fn drop(&mut self) {
        self.0.producer_exited();
    }
}

/// A spawned producer loop and its cancellation signal
#[derive(Debug)]
pub(crate) struct ProducerTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProducerTask {
    /// Spawn `body` on the current tokio runtime
    ///
    /// `body` receives the token that `stop` cancels.
    pub(crate) fn spawn<F, Fut>(stats: Arc<RouterStats>, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let fut = body(cancel.clone());
        let active = ActiveProducer::new(stats);

        let handle = tokio::spawn(async move {
            let _active = active;
            fut.await;
        });

        Self { cancel, handle }
    }

    /// Signal the loop to stop; safe to call repeatedly from anywhere
    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the loop has not yet exited
    pub(crate) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Whether `stop` has been called
    pub(crate) fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
