//! Media inspection via ffprobe.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// The source properties the trim pipeline decides on: duration for range
/// clamping, frame geometry and rate for concat compatibility, codec and
/// bitrate for the encode stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec name
    pub codec: String,
    /// Container bitrate in bits/second, 0 when the container does not report one
    pub bitrate: u64,
}

impl MediaInfo {
    /// Reported bitrate in kbps, when the container carries one.
    pub fn bitrate_kbps(&self) -> Option<u64> {
        (self.bitrate > 0).then_some(self.bitrate / 1000)
    }

    /// Whether two files can go through the concat demuxer together: same
    /// codec, frame size and frame rate.
    pub fn concat_compatible(&self, other: &MediaInfo) -> bool {
        self.codec == other.codec
            && self.width == other.width
            && self.height == other.height
            && (self.fps - other.fps).abs() < 0.01
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a media file for the properties the pipeline needs.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
    media_info_from(probe)
}

/// Get media duration in seconds.
pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let info = probe_media(path).await?;
    Ok(info.duration)
}

fn media_info_from(probe: ProbeOutput) -> MediaResult<MediaInfo> {
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    Ok(MediaInfo {
        duration: numeric_field(probe.format.duration.as_deref()),
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        fps: frame_rate_of(video),
        codec: video.codec_name.clone().unwrap_or_default(),
        bitrate: numeric_field(probe.format.bit_rate.as_deref()),
    })
}

fn numeric_field<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
}

/// Pick a frame rate, preferring the averaged rate but falling back to the
/// raw rate when the average is absent or degenerate (e.g. "0/0").
fn frame_rate_of(stream: &ProbeStream) -> f64 {
    stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(30.0)
}

/// Parse a positive frame rate from "30/1" or "29.97" forms.
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };
    (rate > 0.0).then_some(rate)
}
