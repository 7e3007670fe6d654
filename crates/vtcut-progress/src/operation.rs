//! Operation lifecycle state.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Status of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    /// Whether the operation can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

/// Progress snapshot for one tracked operation.
#[derive(Debug, Clone)]
pub struct OperationProgress {
    /// Caller-chosen identifier
    pub operation_id: String,
    pub status: OperationStatus,
    /// 0-100; monotonic by convention only
    pub progress_percent: f64,
    /// Description of the step currently executing
    pub current_step: String,
    pub total_steps: u32,
    pub current_step_number: u32,
    pub start_time: Instant,
    pub end_time: Option<Instant>,
    pub error_message: Option<String>,
    /// Arbitrary payload stored on completion
    pub result: Option<serde_json::Value>,
}

impl OperationProgress {
    pub(crate) fn new(operation_id: String, total_steps: u32, description: String) -> Self {
        Self {
            operation_id,
            status: OperationStatus::Running,
            progress_percent: 0.0,
            current_step: description,
            total_steps,
            current_step_number: 0,
            start_time: Instant::now(),
            end_time: None,
            error_message: None,
            result: None,
        }
    }

    /// Time spent so far, or total runtime once terminal.
    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Linear extrapolation of remaining time from elapsed time and current
    /// percent. No estimate while percent is zero.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        if self.progress_percent <= 0.0 {
            return None;
        }
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let total = elapsed / (self.progress_percent / 100.0);
        Some(Duration::from_secs_f64((total - elapsed).max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(OperationStatus::Completed.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
        assert!(!OperationStatus::Running.is_terminal());
        assert!(!OperationStatus::Pending.is_terminal());
    }

    #[test]
    fn test_no_estimate_without_progress() {
        let op = OperationProgress::new("op".to_string(), 0, String::new());
        assert!(op.estimated_remaining().is_none());
    }

    #[test]
    fn test_estimate_extrapolates_linearly() {
        let mut op = OperationProgress::new("op".to_string(), 0, String::new());
        op.progress_percent = 25.0;
        op.start_time = Instant::now() - Duration::from_secs(10);
        op.end_time = Some(op.start_time + Duration::from_secs(10));

        // 10s for 25% extrapolates to 40s total, 30s remaining.
        let remaining = op.estimated_remaining().unwrap();
        assert!((remaining.as_secs_f64() - 30.0).abs() < 0.5);
    }
}
