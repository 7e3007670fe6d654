//! Concurrent operation progress tracking for the VideoTextCut core.
//!
//! A [`ProgressTracker`] is a cheap-to-clone handle over a shared registry of
//! operations. Producers report lifecycle transitions and percent updates;
//! consumers poll snapshots or subscribe to callbacks. Cancellation is
//! cooperative: cancelling flips the operation terminal and makes later
//! `update` calls return `false`, which producers check at stage boundaries.

pub mod operation;
pub mod tracker;

pub use operation::{OperationProgress, OperationStatus};
pub use tracker::{ProgressCallback, ProgressTracker};
