//! Trim and encoding configuration.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Hardware codec tried first when NVENC is enabled
pub const NVENC_VIDEO_CODEC: &str = "h264_nvenc";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 20;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Guard gap inserted between consecutive stream-copy cut points, in seconds.
/// Prevents duplicated frames when cuts snap to the same keyframe.
pub const CUT_GUARD_GAP_SECS: f64 = 0.02;

/// Video encoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Try hardware acceleration (NVENC) before the CPU codec
    #[serde(default)]
    pub use_nvenc: bool,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            use_nvenc: false,
        }
    }
}

impl EncodingConfig {
    /// Prioritized codec fallback chain for the encode stage.
    ///
    /// The GPU codec comes first when NVENC is enabled; the configured CPU
    /// codec is always the last resort.
    pub fn codec_candidates(&self) -> Vec<String> {
        let mut candidates = Vec::new();
        if self.use_nvenc && self.codec != NVENC_VIDEO_CODEC {
            candidates.push(NVENC_VIDEO_CODEC.to_string());
        }
        candidates.push(self.codec.clone());
        candidates
    }
}

/// Configuration for the trim pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimConfig {
    /// Output container allow-list (lowercase extensions with dot)
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,

    /// Attempt the stream-copy fast path before re-encoding
    #[serde(default = "default_true")]
    pub prefer_stream_copy: bool,

    /// Minimum duration for a valid segment, in seconds
    #[serde(default = "default_min_segment_duration")]
    pub min_segment_duration: f64,

    /// Gap duration treated as an empty spot, in seconds
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f64,

    /// Bitrate assumed for output-size estimation when the source container
    /// reports none, in kbps
    #[serde(default = "default_estimated_bitrate_kbps")]
    pub estimated_bitrate_kbps: u64,

    /// Encoding settings for the fallback path
    #[serde(default)]
    pub encoding: EncodingConfig,
}

fn default_supported_formats() -> Vec<String> {
    [".mp4", ".avi", ".mov", ".mkv", ".m4v", ".webm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_true() -> bool {
    true
}
fn default_min_segment_duration() -> f64 {
    0.3
}
fn default_silence_threshold() -> f64 {
    0.5
}
fn default_estimated_bitrate_kbps() -> u64 {
    2000
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            supported_formats: default_supported_formats(),
            prefer_stream_copy: true,
            min_segment_duration: default_min_segment_duration(),
            silence_threshold: default_silence_threshold(),
            estimated_bitrate_kbps: default_estimated_bitrate_kbps(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl TrimConfig {
    /// Check an output extension (with dot, any case) against the allow-list.
    pub fn is_supported_format(&self, extension: &str) -> bool {
        let ext = extension.to_lowercase();
        self.supported_formats.iter().any(|f| *f == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_candidates_cpu_only() {
        let encoding = EncodingConfig::default();
        assert_eq!(encoding.codec_candidates(), vec!["libx264".to_string()]);
    }

    #[test]
    fn test_codec_candidates_nvenc_first() {
        let encoding = EncodingConfig {
            use_nvenc: true,
            ..EncodingConfig::default()
        };
        assert_eq!(
            encoding.codec_candidates(),
            vec!["h264_nvenc".to_string(), "libx264".to_string()]
        );
    }

    #[test]
    fn test_codec_candidates_no_duplicate_nvenc() {
        let encoding = EncodingConfig {
            codec: NVENC_VIDEO_CODEC.to_string(),
            use_nvenc: true,
            ..EncodingConfig::default()
        };
        assert_eq!(encoding.codec_candidates(), vec!["h264_nvenc".to_string()]);
    }

    #[test]
    fn test_supported_format_check() {
        let config = TrimConfig::default();
        assert!(config.is_supported_format(".mp4"));
        assert!(config.is_supported_format(".MKV"));
        assert!(!config.is_supported_format(".wav"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: TrimConfig = serde_json::from_str("{}").unwrap();
        assert!(config.prefer_stream_copy);
        assert!((config.min_segment_duration - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.encoding.crf, DEFAULT_CRF);
    }
}
