//! Thread-safe progress tracker for long-running operations.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::operation::{OperationProgress, OperationStatus};

/// Callback invoked with a progress snapshot on every state change.
pub type ProgressCallback = Arc<dyn Fn(OperationProgress) + Send + Sync + 'static>;

#[derive(Default)]
struct Registry {
    operations: HashMap<String, OperationProgress>,
    callbacks: HashMap<String, Vec<ProgressCallback>>,
    cancelled: HashSet<String>,
}

/// Registry of operations keyed by caller-chosen identifiers.
///
/// Cheap to clone; all clones share one registry. All registry access is
/// serialized under a single lock, and subscriber callbacks are dispatched on
/// detached threads outside that lock so a slow observer never blocks a
/// producer.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    inner: Arc<Mutex<Registry>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a new operation in the `Running` state.
    ///
    /// Any prior cancellation flag for this id is cleared, so ids can be
    /// reused across runs.
    pub fn start(
        &self,
        operation_id: impl Into<String>,
        total_steps: u32,
        description: impl Into<String>,
    ) -> OperationProgress {
        let operation_id = operation_id.into();
        let progress = OperationProgress::new(operation_id.clone(), total_steps, description.into());

        let mut registry = self.registry();
        registry.operations.insert(operation_id.clone(), progress.clone());
        registry.cancelled.remove(&operation_id);
        let callbacks = registry.callbacks.get(&operation_id).cloned();
        drop(registry);

        debug!(operation = %operation_id, total_steps, "operation started");
        dispatch(callbacks, &progress);
        progress
    }

    /// Update progress for an operation.
    ///
    /// Returns `false` without mutating anything when the id is unknown or
    /// the operation has been cancelled; a cancelled operation stays
    /// cancelled. Percent is clamped to [0, 100]; when only a step number is
    /// given and total steps are known, percent is derived from the ratio.
    pub fn update(
        &self,
        operation_id: &str,
        progress_percent: Option<f64>,
        current_step: Option<&str>,
        current_step_number: Option<u32>,
    ) -> bool {
        let mut registry = self.registry();

        if !registry.operations.contains_key(operation_id) {
            return false;
        }
        if registry.cancelled.contains(operation_id) {
            if let Some(op) = registry.operations.get_mut(operation_id) {
                op.status = OperationStatus::Cancelled;
            }
            return false;
        }

        let Some(op) = registry.operations.get_mut(operation_id) else {
            return false;
        };

        if let Some(percent) = progress_percent {
            op.progress_percent = percent.clamp(0.0, 100.0);
        }
        if let Some(step) = current_step {
            op.current_step = step.to_string();
        }
        if let Some(step_number) = current_step_number {
            op.current_step_number = step_number;
            if op.total_steps > 0 && progress_percent.is_none() {
                op.progress_percent = f64::from(step_number) / f64::from(op.total_steps) * 100.0;
            }
        }

        let snapshot = op.clone();
        let callbacks = registry.callbacks.get(operation_id).cloned();
        drop(registry);

        dispatch(callbacks, &snapshot);
        true
    }

    /// Mark an operation completed and store its result payload.
    /// No-op on unknown ids.
    pub fn complete(&self, operation_id: &str, result: Option<serde_json::Value>) {
        self.finish(operation_id, |op| {
            op.status = OperationStatus::Completed;
            op.progress_percent = 100.0;
            op.result = result;
        });
    }

    /// Mark an operation failed with a human-readable message.
    /// No-op on unknown ids.
    pub fn fail(&self, operation_id: &str, error_message: impl Into<String>) {
        let message = error_message.into();
        debug!(operation = %operation_id, error = %message, "operation failed");
        self.finish(operation_id, |op| {
            op.status = OperationStatus::Failed;
            op.error_message = Some(message);
        });
    }

    fn finish(&self, operation_id: &str, apply: impl FnOnce(&mut OperationProgress)) {
        let mut registry = self.registry();
        let Some(op) = registry.operations.get_mut(operation_id) else {
            return;
        };
        apply(op);
        op.end_time = Some(Instant::now());

        let snapshot = op.clone();
        let callbacks = registry.callbacks.get(operation_id).cloned();
        drop(registry);

        dispatch(callbacks, &snapshot);
    }

    /// Cancel a pending or running operation.
    ///
    /// Returns `false` when the id is unknown or the operation already
    /// completed or failed. Subsequent `update` calls for a cancelled id
    /// return `false`.
    pub fn cancel(&self, operation_id: &str) -> bool {
        let mut registry = self.registry();
        let Some(op) = registry.operations.get_mut(operation_id) else {
            return false;
        };
        if matches!(op.status, OperationStatus::Completed | OperationStatus::Failed) {
            return false;
        }

        op.status = OperationStatus::Cancelled;
        op.end_time = Some(Instant::now());
        let snapshot = op.clone();
        registry.cancelled.insert(operation_id.to_string());
        let callbacks = registry.callbacks.get(operation_id).cloned();
        drop(registry);

        debug!(operation = %operation_id, "operation cancelled");
        dispatch(callbacks, &snapshot);
        true
    }

    /// Current snapshot for an operation, if tracked.
    pub fn get(&self, operation_id: &str) -> Option<OperationProgress> {
        self.registry().operations.get(operation_id).cloned()
    }

    /// Whether an operation has been cancelled.
    pub fn is_cancelled(&self, operation_id: &str) -> bool {
        self.registry().cancelled.contains(operation_id)
    }

    /// Register a callback notified of every state change for one id.
    ///
    /// Dispatch is fire-and-forget on a detached thread; a panicking
    /// callback is isolated from producers and other subscribers.
    pub fn subscribe<F>(&self, operation_id: impl Into<String>, callback: F)
    where
        F: Fn(OperationProgress) + Send + Sync + 'static,
    {
        self.registry()
            .callbacks
            .entry(operation_id.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Evict terminal operations older than `max_age`, along with their
    /// callbacks and cancellation flags.
    pub fn cleanup(&self, max_age: Duration) {
        let mut registry = self.registry();
        let expired: Vec<String> = registry
            .operations
            .iter()
            .filter(|(_, op)| {
                op.status.is_terminal()
                    && op.end_time.is_some_and(|end| end.elapsed() > max_age)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            registry.operations.remove(id);
            registry.callbacks.remove(id);
            registry.cancelled.remove(id);
        }
        if !expired.is_empty() {
            debug!(evicted = expired.len(), "cleaned up terminal operations");
        }
    }

    /// Snapshot of every tracked operation.
    pub fn all_operations(&self) -> HashMap<String, OperationProgress> {
        self.registry().operations.clone()
    }

    /// Snapshot of operations currently in the `Running` state.
    pub fn active_operations(&self) -> HashMap<String, OperationProgress> {
        self.registry()
            .operations
            .iter()
            .filter(|(_, op)| op.status == OperationStatus::Running)
            .map(|(id, op)| (id.clone(), op.clone()))
            .collect()
    }
}

/// Fan a snapshot out to subscribers, one detached thread per callback.
fn dispatch(callbacks: Option<Vec<ProgressCallback>>, snapshot: &OperationProgress) {
    let Some(callbacks) = callbacks else { return };
    for callback in callbacks {
        let snapshot = snapshot.clone();
        std::thread::spawn(move || (*callback)(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_operation_lifecycle() {
        let tracker = ProgressTracker::new();
        tracker.start("op", 3, "testing");

        assert!(tracker.update("op", Some(33.0), Some("step one"), Some(1)));
        let op = tracker.get("op").unwrap();
        assert_eq!(op.status, OperationStatus::Running);
        assert!((op.progress_percent - 33.0).abs() < f64::EPSILON);
        assert_eq!(op.current_step, "step one");

        tracker.complete("op", Some(serde_json::json!({"output": "done"})));
        let op = tracker.get("op").unwrap();
        assert_eq!(op.status, OperationStatus::Completed);
        assert!((op.progress_percent - 100.0).abs() < f64::EPSILON);
        assert!(op.end_time.is_some());
        assert!(op.result.is_some());
    }

    #[test]
    fn test_update_unknown_operation() {
        let tracker = ProgressTracker::new();
        assert!(!tracker.update("missing", Some(10.0), None, None));
        assert!(tracker.get("missing").is_none());
    }

    #[test]
    fn test_percent_clamped() {
        let tracker = ProgressTracker::new();
        tracker.start("op", 0, "");
        tracker.update("op", Some(150.0), None, None);
        assert!((tracker.get("op").unwrap().progress_percent - 100.0).abs() < f64::EPSILON);
        tracker.update("op", Some(-5.0), None, None);
        assert!(tracker.get("op").unwrap().progress_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_derived_from_step_number() {
        let tracker = ProgressTracker::new();
        tracker.start("op", 4, "");
        tracker.update("op", None, None, Some(1));
        assert!((tracker.get("op").unwrap().progress_percent - 25.0).abs() < f64::EPSILON);

        // Explicit percent wins over the derived value.
        tracker.update("op", Some(90.0), None, Some(2));
        assert!((tracker.get("op").unwrap().progress_percent - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cancel_rejects_further_updates() {
        let tracker = ProgressTracker::new();
        tracker.start("op", 0, "");

        assert!(tracker.cancel("op"));
        assert!(tracker.is_cancelled("op"));
        assert_eq!(tracker.get("op").unwrap().status, OperationStatus::Cancelled);

        assert!(!tracker.update("op", Some(50.0), None, None));
        assert_eq!(tracker.get("op").unwrap().status, OperationStatus::Cancelled);
    }

    #[test]
    fn test_cancel_completed_operation_fails() {
        let tracker = ProgressTracker::new();
        tracker.start("op", 0, "");
        tracker.complete("op", None);

        assert!(!tracker.cancel("op"));
        assert_eq!(tracker.get("op").unwrap().status, OperationStatus::Completed);
    }

    #[test]
    fn test_cancel_unknown_operation_fails() {
        let tracker = ProgressTracker::new();
        assert!(!tracker.cancel("missing"));
    }

    #[test]
    fn test_restart_clears_cancellation() {
        let tracker = ProgressTracker::new();
        tracker.start("op", 0, "");
        tracker.cancel("op");
        tracker.start("op", 0, "second run");

        assert!(!tracker.is_cancelled("op"));
        assert!(tracker.update("op", Some(10.0), None, None));
    }

    #[test]
    fn test_fail_stores_message() {
        let tracker = ProgressTracker::new();
        tracker.start("op", 0, "");
        tracker.fail("op", "ffmpeg exploded");

        let op = tracker.get("op").unwrap();
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.error_message.as_deref(), Some("ffmpeg exploded"));
    }

    #[test]
    fn test_subscriber_receives_state_changes() {
        let tracker = ProgressTracker::new();
        let (tx, rx) = mpsc::channel();
        tracker.subscribe("op", move |op| {
            let _ = tx.send(op.status);
        });

        tracker.start("op", 0, "");
        tracker.update("op", Some(50.0), None, None);
        tracker.complete("op", None);

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        }
        assert!(seen.contains(&OperationStatus::Completed));
    }

    #[test]
    fn test_cleanup_evicts_old_terminal_operations() {
        let tracker = ProgressTracker::new();
        tracker.start("done", 0, "");
        tracker.complete("done", None);
        tracker.start("running", 0, "");

        tracker.cleanup(Duration::ZERO);

        assert!(tracker.get("done").is_none());
        assert!(tracker.get("running").is_some());
    }

    #[test]
    fn test_active_operations_filters_terminal() {
        let tracker = ProgressTracker::new();
        tracker.start("a", 0, "");
        tracker.start("b", 0, "");
        tracker.fail("b", "boom");

        let active = tracker.active_operations();
        assert_eq!(active.len(), 1);
        assert!(active.contains_key("a"));
        assert_eq!(tracker.all_operations().len(), 2);
    }
}
