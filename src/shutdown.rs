//! Graceful shutdown: drain registered cleanup tasks under a timeout.
//!
//! Cleanups run concurrently once the drain starts. The drain succeeds only
//! if every task finishes before the timeout; anything still running at the
//! deadline is abandoned.

use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

type CleanupFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Collects named cleanup tasks and drains them on request.
#[derive(Default)]
pub struct Shutdown {
    cleanups: Vec<(String, CleanupFuture)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup task to run during the drain.
    pub fn register<F>(&mut self, name: impl Into<String>, cleanup: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cleanups.push((name.into(), Box::pin(cleanup)));
    }

    /// Run every registered cleanup concurrently, bounded by `timeout`.
    ///
    /// Returns `Err(Error::ShutdownTimeout)` if the deadline elapses with
    /// tasks still running; those tasks are aborted.
    pub async fn run(self, timeout: Duration) -> Result<()> {
        let total = self.cleanups.len();
        if total == 0 {
            return Ok(());
        }

        info!(tasks = total, "starting graceful shutdown");

        let mut set = JoinSet::new();
        for (name, cleanup) in self.cleanups {
            set.spawn(async move {
                cleanup.await;
                name
            });
        }

        let deadline = tokio::time::Instant::now() + timeout;
        let mut closed = 0usize;

        while closed < total {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok(name))) => {
                    closed += 1;
                    info!(task = %name, closed, total, "closed");
                }
                Ok(Some(Err(e))) => {
                    closed += 1;
                    warn!("cleanup task panicked: {e}");
                }
                Ok(None) => break,
                Err(_) => {
                    let pending = total - closed;
                    warn!(pending, "graceful shutdown timed out");
                    return Err(Error::ShutdownTimeout { pending });
                }
            }
        }

        info!("shutdown complete");
        Ok(())
    }
}
