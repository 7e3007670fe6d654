//! Filler speech detection for the VideoTextCut core.
//!
//! This crate provides:
//! - An ordered, data-driven filler pattern table with context validators
//! - Segment classification (`detect`) mutating `is_filler` in place
//! - Empty-spot (silent gap) detection
//! - Aggregate statistics and advisory suggestions
//!
//! Detection is heuristic by design: text patterns plus a handful of context
//! rules, tuned for spoken-word transcripts with per-segment confidence.

pub mod detector;
pub mod patterns;
pub mod stats;

pub use detector::{
    FillerDetector, DEFAULT_SILENCE_THRESHOLD_SECS, MIN_SEGMENT_CONFIDENCE,
    MIN_SEGMENT_DURATION_SECS, REPEATED_WORD_CONFIDENCE,
};
pub use patterns::{default_patterns, ContextValidator, FillerPattern};
pub use stats::FillerStats;
