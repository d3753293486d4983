//! Core data model.
//!
//! A work item is an opaque key submitted for concurrent processing. Results
//! fan back in as they complete, in arrival order, never exceeding the number
//! of items submitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// An opaque identifier submitted to the dispatcher. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem(String);

impl WorkItem {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkItem {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for WorkItem {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype identifying one dispatch run in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchId(pub Uuid);

impl DispatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for DispatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Work Result
// ---------------------------------------------------------------------------

/// The outcome of processing one work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkResult {
    /// The item this result answers.
    pub item: WorkItem,

    /// Fetched payload. `Null` when the fetch failed and a zero value was
    /// substituted so the item is still accounted for.
    pub payload: serde_json::Value,

    /// Time the worker spent fetching.
    pub duration_ms: u64,

    /// When the worker finished.
    pub fetched_at: DateTime<Utc>,
}

impl WorkResult {
    /// Whether the underlying fetch produced a real payload.
    pub fn is_degraded(&self) -> bool {
        self.payload.is_null()
    }
}

// ---------------------------------------------------------------------------
// Result Set
// ---------------------------------------------------------------------------

/// How a dispatch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Every submitted item reported before the deadline.
    Complete,
    /// The deadline fired first; the set holds what arrived in time.
    TimedOut,
}

/// Results collected by one dispatch run, in arrival order.
///
/// Holds at most as many results as items were submitted. Built up during
/// collection and handed to the caller as-is; never mutated afterward. A
/// short set is the normal timeout outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    results: Vec<WorkResult>,
    submitted: usize,
    outcome: DispatchOutcome,
    elapsed_ms: u64,
}

impl ResultSet {
    pub(crate) fn new(
        results: Vec<WorkResult>,
        submitted: usize,
        outcome: DispatchOutcome,
        elapsed_ms: u64,
    ) -> Self {
        debug_assert!(results.len() <= submitted);
        Self {
            results,
            submitted,
            outcome,
            elapsed_ms,
        }
    }

    /// Collected results, in arrival order.
    pub fn results(&self) -> &[WorkResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<WorkResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of items originally submitted.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn outcome(&self) -> DispatchOutcome {
        self.outcome
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == DispatchOutcome::Complete
    }

    /// Wall-clock time the dispatch run took.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Percentage of submitted items that reported before collection stopped.
    pub fn success_rate(&self) -> f64 {
        if self.submitted == 0 {
            return 100.0;
        }
        (self.results.len() as f64 / self.submitted as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_for(key: &str) -> WorkResult {
        WorkResult {
            item: WorkItem::from(key),
            payload: serde_json::json!({ "id": key }),
            duration_ms: 5,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn dispatch_id_displays_short_form() {
        let id = DispatchId::new();
        assert_eq!(id.to_string().len(), 8);
    }

    #[test]
    fn complete_set_reports_full_success_rate() {
        let set = ResultSet::new(
            vec![result_for("1"), result_for("2")],
            2,
            DispatchOutcome::Complete,
            12,
        );
        assert!(set.is_complete());
        assert_eq!(set.len(), 2);
        assert_eq!(set.success_rate(), 100.0);
    }

    #[test]
    fn timed_out_set_reports_partial_success_rate() {
        let set = ResultSet::new(vec![result_for("1")], 4, DispatchOutcome::TimedOut, 50);
        assert!(!set.is_complete());
        assert_eq!(set.success_rate(), 25.0);
    }

    #[test]
    fn empty_submission_counts_as_full_success() {
        let set = ResultSet::new(Vec::new(), 0, DispatchOutcome::Complete, 0);
        assert!(set.is_empty());
        assert_eq!(set.success_rate(), 100.0);
    }

    #[test]
    fn null_payload_marks_degraded_result() {
        let degraded = WorkResult {
            item: WorkItem::from("42"),
            payload: serde_json::Value::Null,
            duration_ms: 3,
            fetched_at: Utc::now(),
        };
        assert!(degraded.is_degraded());
        assert!(!result_for("1").is_degraded());
    }
}
