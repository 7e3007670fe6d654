//! Shared data models for the VideoTextCut core.
//!
//! This crate provides Serde-serializable types for:
//! - Transcript segments with word-level timings
//! - The timeline container and active-range computation
//! - Word-range reconciliation of edited text against original timings
//! - Trim and encoding configuration

pub mod config;
pub mod segment;
pub mod timeline;

// Re-export common types
pub use config::{
    EncodingConfig, TrimConfig, CUT_GUARD_GAP_SECS, DEFAULT_AUDIO_CODEC, DEFAULT_VIDEO_CODEC,
    NVENC_VIDEO_CODEC,
};
pub use segment::{Segment, WordTiming};
pub use timeline::{merge_ranges, Timeline, GAP_TOLERANCE_SECS, MARKER_TOLERANCE_SECS};
