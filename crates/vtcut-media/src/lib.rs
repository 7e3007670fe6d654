//! FFmpeg-based trim pipeline for the VideoTextCut core.
//!
//! Wraps the `ffmpeg`/`ffprobe` CLI tools behind a typed command builder and
//! exposes [`TrimPipeline`], which cuts a source video down to a timeline's
//! active time ranges. A lossless stream-copy path is tried first; a
//! frame-accurate re-encode path with a codec fallback chain covers the rest.

pub mod command;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod trim;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use monitor::{EncodeMonitor, EncodeProgress};
pub use probe::{get_duration, probe_media, MediaInfo};
pub use trim::{TrimPipeline, TrimSummary};
