//! Fan-out/fan-in dispatch: one worker per item, results collected in
//! completion order until every item has reported or the deadline fires.

use crate::fetch::Fetcher;
use crate::model::{DispatchId, DispatchOutcome, ResultSet, WorkItem, WorkResult};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fans work items out to parallel workers and fans their results back in
/// under an optional deadline.
pub struct Dispatcher {
    fetcher: Arc<dyn Fetcher>,
    abort: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            abort: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Cancel every in-flight dispatch. Running collectors return whatever
    /// has arrived so far as a timed-out set.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    /// Number of workers currently running.
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Dispatch `items` and collect results until all have reported or the
    /// deadline elapses, whichever comes first. `None` collects unbounded.
    ///
    /// One worker is spawned per item, all eagerly. The result channel is
    /// sized to the submission count so a worker that finishes after
    /// collection has stopped can still park its result without blocking
    /// forever. When the deadline fires, outstanding workers are cancelled
    /// and whatever arrived in time is returned; an incomplete set is a
    /// normal outcome, not an error.
    pub async fn dispatch(&self, items: Vec<WorkItem>, deadline: Option<Duration>) -> ResultSet {
        let id = DispatchId::new();
        let total = items.len();
        let start = Instant::now();
        let deadline_at = deadline.map(|d| start + d);

        // Capacity must cover every possible writer, even after the
        // collector stops reading.
        let (tx, mut rx) = mpsc::channel::<WorkResult>(total.max(1));
        let cancel = self.abort.child_token();

        info!(dispatch = %id, items = total, ?deadline, "dispatching");

        for item in items {
            let fetcher = Arc::clone(&self.fetcher);
            let tx = tx.clone();
            let cancel = cancel.clone();
            let active = Arc::clone(&self.active);
            tokio::spawn(worker(fetcher, item, tx, cancel, active));
        }
        // The collector holds no sender: once every worker is gone the
        // channel closes and collection cannot hang.
        drop(tx);

        let mut results: Vec<WorkResult> = Vec::with_capacity(total);

        let outcome = loop {
            if results.len() == total {
                break DispatchOutcome::Complete;
            }

            let received = match deadline_at {
                Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => break DispatchOutcome::TimedOut,
                },
                None => rx.recv().await,
            };

            match received {
                Some(result) => {
                    debug!(
                        dispatch = %id,
                        item = %result.item,
                        collected = results.len() + 1,
                        total,
                        "collected"
                    );
                    results.push(result);
                }
                // All senders gone with results still missing: workers were
                // aborted or died without reporting. Return what arrived,
                // as on a deadline.
                None => break DispatchOutcome::TimedOut,
            }
        };

        // Stop outstanding workers promptly. Completed-but-late sends are
        // absorbed by the channel buffer and never read.
        cancel.cancel();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome {
            DispatchOutcome::Complete => {
                info!(dispatch = %id, collected = results.len(), elapsed_ms, "dispatch complete");
            }
            DispatchOutcome::TimedOut => {
                warn!(
                    dispatch = %id,
                    collected = results.len(),
                    submitted = total,
                    elapsed_ms,
                    "deadline elapsed, abandoning outstanding work"
                );
            }
        }

        ResultSet::new(results, total, outcome, elapsed_ms)
    }
}

/// One worker: fetch the item, report the result.
///
/// A fetch failure degrades the result to a `Null` payload instead of
/// aborting the run; cancellation abandons the item without reporting.
async fn worker(
    fetcher: Arc<dyn Fetcher>,
    item: WorkItem,
    tx: mpsc::Sender<WorkResult>,
    cancel: CancellationToken,
    active: Arc<AtomicUsize>,
) {
    active.fetch_add(1, Ordering::Relaxed);
    let start = Instant::now();

    let fetched = tokio::select! {
        _ = cancel.cancelled() => None,
        fetched = fetcher.fetch(&item) => Some(fetched),
    };

    match fetched {
        None => debug!(item = %item, "cancelled, abandoning fetch"),
        Some(fetched) => {
            let payload = match fetched {
                Ok(value) => value,
                Err(e) => {
                    warn!(item = %item, error = %e, "fetch failed");
                    serde_json::Value::Null
                }
            };

            let duration_ms = start.elapsed().as_millis() as u64;
            debug!(item = %item, duration_ms, "fetched");

            // Pre-sized channel: this cannot block while capacity covers
            // every writer, even if the collector is gone.
            let _ = tx
                .send(WorkResult {
                    item,
                    payload,
                    duration_ms,
                    fetched_at: Utc::now(),
                })
                .await;
        }
    }

    active.fetch_sub(1, Ordering::Relaxed);
}
