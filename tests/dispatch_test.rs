//! Integration tests for the dispatcher.
//!
//! Timing-sensitive tests run under tokio's paused clock, so deadlines and
//! latencies are exact rather than approximate.

use harvest::dispatch::Dispatcher;
use harvest::error::Error;
use harvest::fetch::FetchFn;
use harvest::model::{DispatchOutcome, WorkItem};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn items(keys: &[&str]) -> Vec<WorkItem> {
    keys.iter().map(|key| WorkItem::from(*key)).collect()
}

/// Dispatcher whose workers answer `{ "id": <item> }` immediately.
fn instant_dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(FetchFn::new(|item: WorkItem| async move {
        Ok::<_, Error>(json!({ "id": item.as_str() }))
    })))
}

// ---------------------------------------------------------------------------
// Completion: every item reports when nothing bounds the collection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unbounded_deadline_collects_every_item() {
    let dispatcher = instant_dispatcher();

    let set = dispatcher.dispatch(items(&["1", "2", "3"]), None).await;

    assert_eq!(set.len(), 3);
    assert!(set.is_complete());
    assert_eq!(set.outcome(), DispatchOutcome::Complete);

    // Arrival order is unspecified; the contents are not.
    let mut ids: Vec<&str> = set
        .results()
        .iter()
        .map(|result| result.payload["id"].as_str().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, ["1", "2", "3"]);
}

#[tokio::test]
async fn repeated_dispatch_yields_equal_cardinality() {
    let dispatcher = instant_dispatcher();

    let first = dispatcher.dispatch(items(&["a", "b", "c"]), None).await;
    let second = dispatcher.dispatch(items(&["a", "b", "c"]), None).await;

    assert_eq!(first.len(), 3);
    assert_eq!(first.len(), second.len());
}

#[tokio::test]
async fn empty_submission_returns_complete_empty_set() {
    let dispatcher = instant_dispatcher();

    let set = dispatcher.dispatch(Vec::new(), None).await;

    assert!(set.is_empty());
    assert!(set.is_complete());
}

// ---------------------------------------------------------------------------
// Deadline: collection stops on time, keeping whatever arrived
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn deadline_shorter_than_every_worker_collects_nothing() {
    let dispatcher = Dispatcher::new(Arc::new(FetchFn::new(|item: WorkItem| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok::<_, Error>(json!({ "id": item.as_str() }))
    })));

    let start = tokio::time::Instant::now();
    let set = dispatcher
        .dispatch(items(&["1", "2", "3"]), Some(Duration::from_millis(50)))
        .await;

    assert_eq!(set.len(), 0);
    assert_eq!(set.outcome(), DispatchOutcome::TimedOut);
    // The dispatcher returns at the deadline, not later.
    assert_eq!(start.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn deadline_admits_exactly_the_fast_worker() {
    let dispatcher = Dispatcher::new(Arc::new(FetchFn::new(|item: WorkItem| async move {
        let latency = match item.as_str() {
            "1" => 10,
            _ => 500,
        };
        tokio::time::sleep(Duration::from_millis(latency)).await;
        Ok::<_, Error>(json!({ "id": item.as_str() }))
    })));

    let start = tokio::time::Instant::now();
    let set = dispatcher
        .dispatch(items(&["1", "2"]), Some(Duration::from_millis(50)))
        .await;

    assert_eq!(set.len(), 1);
    assert_eq!(set.results()[0].item.as_str(), "1");
    assert_eq!(set.outcome(), DispatchOutcome::TimedOut);
    assert_eq!(start.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn deadline_splits_a_staggered_batch() {
    // Worker i finishes at (i + 1) * 20ms; a 70ms deadline admits three.
    let dispatcher = Dispatcher::new(Arc::new(FetchFn::new(|item: WorkItem| async move {
        let rank: u64 = item.as_str().parse().unwrap();
        tokio::time::sleep(Duration::from_millis((rank + 1) * 20)).await;
        Ok::<_, Error>(json!({ "id": item.as_str() }))
    })));

    let set = dispatcher
        .dispatch(
            items(&["0", "1", "2", "3", "4"]),
            Some(Duration::from_millis(70)),
        )
        .await;

    assert_eq!(set.len(), 3);
    assert!(set.len() <= set.submitted());
    assert_eq!(set.outcome(), DispatchOutcome::TimedOut);
}

// ---------------------------------------------------------------------------
// Failure: a bad fetch degrades one result, never the run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_fetch_degrades_to_null_payload() {
    let dispatcher = Dispatcher::new(Arc::new(FetchFn::new(|item: WorkItem| async move {
        if item.as_str() == "2" {
            Err(Error::Other("lookup failed".to_string()))
        } else {
            Ok(json!({ "id": item.as_str() }))
        }
    })));

    let set = dispatcher.dispatch(items(&["1", "2", "3"]), None).await;

    assert_eq!(set.len(), 3);
    assert!(set.is_complete());

    let degraded: Vec<_> = set
        .results()
        .iter()
        .filter(|result| result.is_degraded())
        .collect();
    assert_eq!(degraded.len(), 1);
    assert_eq!(degraded[0].item.as_str(), "2");
}

// ---------------------------------------------------------------------------
// Cancellation: abandoned workers stop instead of running to completion
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn timeout_cancels_outstanding_workers() {
    let completed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completed);

    let dispatcher = Dispatcher::new(Arc::new(FetchFn::new(move |item: WorkItem| {
        let counter = Arc::clone(&counter);
        async move {
            let latency = match item.as_str() {
                "fast" => 10,
                _ => 500,
            };
            tokio::time::sleep(Duration::from_millis(latency)).await;
            counter.fetch_add(1, Ordering::Relaxed);
            Ok::<_, Error>(json!({ "id": item.as_str() }))
        }
    })));

    let set = dispatcher
        .dispatch(
            items(&["fast", "slow-1", "slow-2"]),
            Some(Duration::from_millis(50)),
        )
        .await;
    assert_eq!(set.len(), 1);

    // The cancelled workers wind down without finishing their fetch.
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
    assert_eq!(dispatcher.in_flight(), 0);
    assert_eq!(completed.load(Ordering::Relaxed), 1);

    // Even once their latency has long passed, the abandoned fetches never
    // ran to completion.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(completed.load(Ordering::Relaxed), 1);
}

#[tokio::test(start_paused = true)]
async fn abort_stops_an_unbounded_dispatch() {
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(FetchFn::new(
        |item: WorkItem| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, Error>(json!({ "id": item.as_str() }))
        },
    ))));

    let aborter = Arc::clone(&dispatcher);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        aborter.abort();
    });

    let start = tokio::time::Instant::now();
    let set = dispatcher.dispatch(items(&["1", "2"]), None).await;

    assert_eq!(set.len(), 0);
    assert_eq!(set.outcome(), DispatchOutcome::TimedOut);
    assert_eq!(start.elapsed(), Duration::from_millis(20));
}
