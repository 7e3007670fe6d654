//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Maximum number of stderr lines carried into an error.
const STDERR_TAIL_LINES: usize = 8;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Nothing to keep: every segment is deleted")]
    NothingToKeep,

    #[error("No viable clips: all keep ranges collapsed after clamping")]
    NoViableClips,

    #[error("All encoder candidates failed (tried: {0})")]
    CodecsExhausted(String),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr: stderr.map(|s| stderr_tail(&s)),
            exit_code,
        }
    }

    /// Create an FFprobe failure error.
    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr: stderr.map(|s| stderr_tail(&s)),
        }
    }
}

/// Keep only the last few lines of captured stderr. FFmpeg prints the
/// actionable diagnostic last; the preamble is noise.
pub fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_short_input_unchanged() {
        assert_eq!(stderr_tail("one\ntwo"), "one\ntwo");
    }

    #[test]
    fn test_stderr_tail_truncates_long_input() {
        let input: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(&input);
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 19"));
        assert!(!tail.contains("line 0"));
    }

    #[test]
    fn test_ffmpeg_failed_bounds_stderr() {
        let input: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let err = MediaError::ffmpeg_failed("encode failed", Some(input), Some(1));
        if let MediaError::FfmpegFailed { stderr, .. } = err {
            assert_eq!(stderr.unwrap().lines().count(), STDERR_TAIL_LINES);
        } else {
            panic!("wrong variant");
        }
    }
}
