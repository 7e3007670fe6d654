//! Transcript-driven trim pipeline.
//!
//! Turns a timeline's merged active time ranges into an output video:
//! stream-copy cuts concatenated with the concat demuxer when possible
//! (fast, lossless), otherwise frame-accurate re-encoded subclips joined
//! and encoded through a codec fallback chain.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use vtcut_models::{Timeline, TrimConfig, CUT_GUARD_GAP_SECS};
use vtcut_progress::ProgressTracker;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::monitor::EncodeMonitor;
use crate::probe::{probe_media, MediaInfo};

/// Fast input seek lands this far before the cut, leaving the accurate
/// output seek a short decode window.
const FAST_SEEK_LEAD_SECS: f64 = 5.0;

/// Outcome of a completed trim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimSummary {
    pub output_path: PathBuf,
    /// Source duration in seconds
    pub original_duration: f64,
    /// Output duration in seconds
    pub final_duration: f64,
    /// Number of merged keep ranges that went into the output
    pub ranges_kept: usize,
    /// Whether the lossless stream-copy path produced the output
    pub fast_path_used: bool,
}

/// Transcript-driven video trimmer.
pub struct TrimPipeline {
    config: TrimConfig,
    tracker: ProgressTracker,
    runner: FfmpegRunner,
}

impl TrimPipeline {
    pub fn new(config: TrimConfig, tracker: ProgressTracker) -> Self {
        Self {
            config,
            tracker,
            runner: FfmpegRunner::new(),
        }
    }

    /// Trim `input` down to the timeline's active time ranges.
    ///
    /// The caller owns the operation lifecycle on the tracker (`start`,
    /// `complete`/`fail`); the pipeline reports phase progress under
    /// `operation_id` and honors cancellation at stage boundaries.
    pub async fn trim(
        &self,
        input: &Path,
        timeline: &Timeline,
        output: &Path,
        operation_id: &str,
    ) -> MediaResult<TrimSummary> {
        self.ensure_not_cancelled(operation_id)?;
        self.validate(input, output).await?;
        self.tracker
            .update(operation_id, Some(5.0), Some("Validated input"), None);

        let ranges = timeline.active_time_ranges();
        if ranges.is_empty() {
            return Err(MediaError::NothingToKeep);
        }
        debug!(ranges = ranges.len(), "computed keep ranges");
        self.tracker
            .update(operation_id, Some(10.0), Some("Computed keep ranges"), None);

        self.ensure_not_cancelled(operation_id)?;
        let info = probe_media(input).await?;

        // Scratch space for subclips and the concat list; removed on drop.
        let temp_dir = tempfile::tempdir()?;

        let mut fast_path_used = false;
        if self.config.prefer_stream_copy {
            fast_path_used = self
                .fast_path(input, output, &ranges, &temp_dir, operation_id)
                .await?;
            if !fast_path_used {
                info!("stream-copy fast path failed, falling back to re-encode");
            }
        }

        let ranges_kept = if fast_path_used {
            ranges.len()
        } else {
            self.fallback_path(input, output, &ranges, &info, &temp_dir, operation_id)
                .await?
        };

        self.ensure_not_cancelled(operation_id)?;
        let final_duration = probe_media(output).await.map(|i| i.duration).unwrap_or(0.0);
        self.tracker
            .update(operation_id, Some(100.0), Some("Trim finished"), None);

        info!(
            output = %output.display(),
            original_duration = info.duration,
            final_duration,
            ranges_kept,
            fast_path_used,
            "trim completed"
        );

        Ok(TrimSummary {
            output_path: output.to_path_buf(),
            original_duration: info.duration,
            final_duration,
            ranges_kept,
            fast_path_used,
        })
    }

    fn ensure_not_cancelled(&self, operation_id: &str) -> MediaResult<()> {
        if self.tracker.is_cancelled(operation_id) {
            return Err(MediaError::Cancelled);
        }
        Ok(())
    }

    async fn validate(&self, input: &Path, output: &Path) -> MediaResult<()> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        let extension = output
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        if !self.config.is_supported_format(&extension) {
            return Err(MediaError::UnsupportedFormat(extension));
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Lossless path: stream-copy each range into a subclip, then join with
    /// the concat demuxer. Returns `Ok(false)` when any step fails so the
    /// caller can fall back to re-encoding.
    async fn fast_path(
        &self,
        input: &Path,
        output: &Path,
        ranges: &[(f64, f64)],
        temp_dir: &TempDir,
        operation_id: &str,
    ) -> MediaResult<bool> {
        let guarded = apply_guard_gap(ranges);
        let mut clip_paths = Vec::with_capacity(guarded.len());

        for (i, &(start, end)) in guarded.iter().enumerate() {
            self.ensure_not_cancelled(operation_id)?;

            let clip_path = temp_dir.path().join(format!("cut_{i:04}.mp4"));
            let cmd = FfmpegCommand::new(input, &clip_path)
                .seek(start)
                .duration(end - start)
                .codec_copy()
                .output_args(["-avoid_negative_ts", "make_zero"]);

            if let Err(err) = self.runner.run(&cmd).await {
                warn!(clip = i, %err, "stream-copy cut failed, aborting fast path");
                return Ok(false);
            }
            clip_paths.push(clip_path);

            let percent = 15.0 + 60.0 * (i + 1) as f64 / guarded.len() as f64;
            self.tracker.update(
                operation_id,
                Some(percent),
                Some("Extracting segments (stream copy)"),
                None,
            );
        }

        self.ensure_not_cancelled(operation_id)?;
        let concat_list = write_concat_list(temp_dir, &clip_paths).await?;
        self.tracker
            .update(operation_id, Some(85.0), Some("Joining segments"), None);

        // ADTS audio from MPEG-TS-style cuts needs repacketizing for MP4;
        // retry without the filter when the streams do not carry ADTS.
        let with_bsf = FfmpegCommand::new(&concat_list, output)
            .concat_input()
            .codec_copy()
            .output_args(["-bsf:a", "aac_adtstoasc", "-movflags", "+faststart"]);
        if self.runner.run(&with_bsf).await.is_ok() {
            return Ok(true);
        }

        let without_bsf = FfmpegCommand::new(&concat_list, output)
            .concat_input()
            .codec_copy()
            .output_args(["-movflags", "+faststart"]);
        match self.runner.run(&without_bsf).await {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(%err, "concat demuxer failed, aborting fast path");
                Ok(false)
            }
        }
    }

    /// Frame-accurate path: clamp and extract each range with two-pass
    /// seeking and re-encoding, then join the subclips. Returns the number
    /// of clips that made it into the output.
    async fn fallback_path(
        &self,
        input: &Path,
        output: &Path,
        ranges: &[(f64, f64)],
        info: &MediaInfo,
        temp_dir: &TempDir,
        operation_id: &str,
    ) -> MediaResult<usize> {
        let clamped = clamp_ranges(ranges, info.duration);
        if clamped.is_empty() {
            return Err(MediaError::NoViableClips);
        }

        let encoding = &self.config.encoding;
        let mut clip_paths = Vec::with_capacity(clamped.len());

        for (i, &(start, end)) in clamped.iter().enumerate() {
            self.ensure_not_cancelled(operation_id)?;

            let clip_path = temp_dir.path().join(format!("clip_{i:04}.mp4"));
            let fast_seek = (start - FAST_SEEK_LEAD_SECS).max(0.0);

            let cmd = FfmpegCommand::new(input, &clip_path)
                .seek(fast_seek)
                .output_seek(start - fast_seek)
                .duration(end - start)
                .video_codec(vtcut_models::DEFAULT_VIDEO_CODEC)
                .preset(&encoding.preset)
                .crf(encoding.crf)
                .audio_codec(&encoding.audio_codec)
                .audio_bitrate(&encoding.audio_bitrate)
                .output_args(["-avoid_negative_ts", "make_zero"]);

            match self.runner.run(&cmd).await {
                Ok(()) => clip_paths.push(clip_path),
                Err(err) => {
                    warn!(clip = i, start, end, %err, "clip extraction failed, skipping");
                }
            }

            let percent = 15.0 + 45.0 * (i + 1) as f64 / clamped.len() as f64;
            self.tracker.update(
                operation_id,
                Some(percent),
                Some("Extracting segments (re-encode)"),
                None,
            );
        }

        if clip_paths.is_empty() {
            return Err(MediaError::NoViableClips);
        }

        self.ensure_not_cancelled(operation_id)?;
        // Prefer the source's own bitrate for size estimation; the configured
        // value only covers containers that report none.
        let estimated_kbps = info
            .bitrate_kbps()
            .unwrap_or(self.config.estimated_bitrate_kbps);
        self.join_clips(output, &clip_paths, estimated_kbps, temp_dir, operation_id)
            .await?;
        Ok(clip_paths.len())
    }

    /// Join re-encoded subclips with the codec fallback chain.
    async fn join_clips(
        &self,
        output: &Path,
        clip_paths: &[PathBuf],
        estimated_kbps: u64,
        temp_dir: &TempDir,
        operation_id: &str,
    ) -> MediaResult<()> {
        let uniform = self.clips_are_uniform(clip_paths).await;
        let concat_list = if uniform {
            Some(write_concat_list(temp_dir, clip_paths).await?)
        } else {
            None
        };

        let mut total_duration = 0.0;
        for clip in clip_paths {
            if let Ok(info) = probe_media(clip).await {
                total_duration += info.duration;
            }
        }

        let encoding = &self.config.encoding;
        let candidates = encoding.codec_candidates();
        let mut last_err = None;

        for codec in &candidates {
            self.ensure_not_cancelled(operation_id)?;

            let cmd = match &concat_list {
                Some(list) => FfmpegCommand::new(list, output)
                    .concat_input()
                    .video_codec(codec)
                    .preset(&encoding.preset)
                    .crf(encoding.crf)
                    .audio_codec(&encoding.audio_codec)
                    .audio_bitrate(&encoding.audio_bitrate)
                    .output_args(["-movflags", "+faststart"]),
                None => self.filter_concat_command(output, clip_paths, codec).await?,
            };

            let tracker = self.tracker.clone();
            let op = operation_id.to_string();
            let monitor = EncodeMonitor::spawn(
                output.to_path_buf(),
                total_duration,
                estimated_kbps,
                move |p| {
                    tracker.update(&op, Some(60.0 + p.percent * 0.35), Some("Encoding"), None);
                },
            );

            let result = self.runner.run(&cmd).await;
            monitor.stop().await;

            match result {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(codec = %codec, %err, "encoder failed, trying next candidate");
                    // A failed attempt can leave a truncated output behind.
                    let _ = tokio::fs::remove_file(output).await;
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| MediaError::CodecsExhausted(candidates.join(", "))))
    }

    /// Whether every clip can go through the concat demuxer with the first.
    async fn clips_are_uniform(&self, clip_paths: &[PathBuf]) -> bool {
        let mut first: Option<MediaInfo> = None;
        for clip in clip_paths {
            let info = match probe_media(clip).await {
                Ok(info) => info,
                Err(_) => return false,
            };
            match &first {
                None => first = Some(info),
                Some(f) => {
                    if !f.concat_compatible(&info) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Build a filter_complex concat command, scaling every clip to the
    /// first clip's frame size.
    async fn filter_concat_command(
        &self,
        output: &Path,
        clip_paths: &[PathBuf],
        codec: &str,
    ) -> MediaResult<FfmpegCommand> {
        let first = probe_media(&clip_paths[0]).await?;
        let filter = build_concat_filter(clip_paths.len(), first.width, first.height);

        let encoding = &self.config.encoding;
        let mut cmd = FfmpegCommand::new(&clip_paths[0], output);
        for clip in &clip_paths[1..] {
            cmd = cmd.add_input(clip);
        }
        Ok(cmd
            .filter_complex(filter)
            .output_args(["-map", "[outv]", "-map", "[outa]"])
            .video_codec(codec)
            .preset(&encoding.preset)
            .crf(encoding.crf)
            .audio_codec(&encoding.audio_codec)
            .audio_bitrate(&encoding.audio_bitrate)
            .output_args(["-movflags", "+faststart"]))
    }
}

/// Shave the guard gap off every range end except the last, so consecutive
/// stream-copy cuts never snap to the same keyframe twice.
fn apply_guard_gap(ranges: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut guarded: Vec<(f64, f64)> = ranges.to_vec();
    let len = guarded.len();
    for (start, end) in guarded.iter_mut().take(len.saturating_sub(1)) {
        *end = (*end - CUT_GUARD_GAP_SECS).max(*start);
    }
    guarded
}

/// Clamp ranges to `[0, duration]` and drop only the ones that collapse to
/// nothing. Short ranges survive: a single kept word is a legitimate cut.
fn clamp_ranges(ranges: &[(f64, f64)], duration: f64) -> Vec<(f64, f64)> {
    let mut clamped = Vec::with_capacity(ranges.len());
    for &(start, end) in ranges {
        let start = start.max(0.0);
        let end = end.min(duration);
        if end - start > f64::EPSILON {
            clamped.push((start, end));
        } else {
            warn!(start, end, "keep range collapsed after clamping, skipping");
        }
    }
    clamped
}

/// Concat filter graph joining `n` inputs scaled to a common frame size.
fn build_concat_filter(n: usize, width: u32, height: u32) -> String {
    let mut filter = String::new();
    for i in 0..n {
        filter.push_str(&format!("[{i}:v]scale={width}:{height},setsar=1[v{i}];"));
    }
    for i in 0..n {
        filter.push_str(&format!("[v{i}][{i}:a]"));
    }
    filter.push_str(&format!("concat=n={n}:v=1:a=1[outv][outa]"));
    filter
}

/// Write a concat demuxer list file naming each clip.
async fn write_concat_list(temp_dir: &TempDir, clip_paths: &[PathBuf]) -> MediaResult<PathBuf> {
    let list_path = temp_dir.path().join("concat.txt");
    let content: String = clip_paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display()))
        .collect();
    tokio::fs::write(&list_path, &content).await?;
    Ok(list_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtcut_models::Segment;

    fn pipeline() -> TrimPipeline {
        TrimPipeline::new(TrimConfig::default(), ProgressTracker::new())
    }

    #[test]
    fn test_apply_guard_gap_shaves_all_but_last() {
        let guarded = apply_guard_gap(&[(0.0, 2.0), (3.0, 5.0), (6.0, 8.0)]);
        assert!((guarded[0].1 - 1.98).abs() < 1e-9);
        assert!((guarded[1].1 - 4.98).abs() < 1e-9);
        assert!((guarded[2].1 - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_guard_gap_never_inverts_range() {
        let guarded = apply_guard_gap(&[(1.0, 1.01), (2.0, 3.0)]);
        assert!((guarded[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_ranges_drops_only_collapsed() {
        let clamped = clamp_ranges(&[(-1.0, 2.0), (9.9, 15.0), (12.0, 14.0)], 10.0);
        assert_eq!(clamped, vec![(0.0, 2.0), (9.9, 10.0)]);
    }

    #[test]
    fn test_clamp_ranges_keeps_short_ranges() {
        // A single kept word can be well under any minimum segment length.
        let clamped = clamp_ranges(&[(1.0, 1.2)], 10.0);
        assert_eq!(clamped, vec![(1.0, 1.2)]);
    }

    #[test]
    fn test_build_concat_filter() {
        let filter = build_concat_filter(2, 1920, 1080);
        assert!(filter.contains("[0:v]scale=1920:1080,setsar=1[v0];"));
        assert!(filter.contains("[v0][0:a][v1][1:a]"));
        assert!(filter.ends_with("concat=n=2:v=1:a=1[outv][outa]"));
    }

    #[tokio::test]
    async fn test_trim_missing_input() {
        let timeline = Timeline::new(Vec::new(), 0.0, "gone.mp4");
        let err = pipeline()
            .trim(
                Path::new("/nonexistent/gone.mp4"),
                &timeline,
                Path::new("/tmp/out.mp4"),
                "op",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_trim_unsupported_output_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        tokio::fs::write(&input, b"stub").await.unwrap();

        let timeline = Timeline::new(Vec::new(), 0.0, &input);
        let err = pipeline()
            .trim(&input, &timeline, &dir.path().join("out.wav"), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_trim_nothing_to_keep() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        tokio::fs::write(&input, b"stub").await.unwrap();

        let mut segment = Segment::new(1, 0.0, 2.0, "deleted line", 0.9);
        segment.is_deleted = true;
        let timeline = Timeline::new(vec![segment], 2.0, &input);

        let err = pipeline()
            .trim(&input, &timeline, &dir.path().join("out.mp4"), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NothingToKeep));
    }

    #[tokio::test]
    async fn test_trim_honors_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        tokio::fs::write(&input, b"stub").await.unwrap();

        let tracker = ProgressTracker::new();
        tracker.start("op", 0, "trim");
        tracker.cancel("op");

        let timeline = Timeline::new(
            vec![Segment::new(1, 0.0, 2.0, "kept line", 0.9)],
            2.0,
            &input,
        );
        let err = TrimPipeline::new(TrimConfig::default(), tracker)
            .trim(&input, &timeline, &dir.path().join("out.mp4"), "op")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));
    }
}
