//! Timeline container and active-range computation.

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// Gap tolerance when merging active time ranges, in seconds.
///
/// Two ranges closer than this are joined so that trimming does not produce
/// sub-frame cuts from slightly inconsistent word timings.
pub const GAP_TOLERANCE_SECS: f64 = 0.1;

/// Tolerance when matching a timestamp marker line back to a segment.
pub const MARKER_TOLERANCE_SECS: f64 = 0.1;

/// An ordered sequence of transcript segments for one source media file.
///
/// Insertion order is chronological by convention but not guaranteed sorted;
/// range computations sort by start time themselves. Segments may overlap or
/// leave gaps; only computed active ranges are ever merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// Segments in emission order
    pub segments: Vec<Segment>,
    /// Duration of the source media in seconds, independent of coverage
    pub total_duration: f64,
    /// Path to the source media file
    pub source_path: PathBuf,
}

impl Timeline {
    pub fn new(segments: Vec<Segment>, total_duration: f64, source_path: impl Into<PathBuf>) -> Self {
        Self {
            segments,
            total_duration,
            source_path: source_path.into(),
        }
    }

    /// Segments that are not deleted, in original order.
    pub fn active_segments(&self) -> Vec<&Segment> {
        self.segments.iter().filter(|s| !s.is_deleted).collect()
    }

    /// Total duration of active segments in seconds.
    pub fn active_duration(&self) -> f64 {
        self.active_segments().iter().map(|s| s.duration()).sum()
    }

    /// How much shorter the trimmed output will be, in [0.0, 1.0].
    pub fn compression_ratio(&self) -> f64 {
        if self.total_duration <= 0.0 {
            return 0.0;
        }
        (1.0 - self.active_duration() / self.total_duration).clamp(0.0, 1.0)
    }

    /// Mark every filler segment as deleted.
    pub fn remove_filler_segments(&mut self) {
        for segment in &mut self.segments {
            if segment.is_filler {
                segment.is_deleted = true;
            }
        }
    }

    /// Render active segments as editable text, one segment per block.
    ///
    /// With timestamps, each segment is demarcated by a `[{start}s - {end}s]`
    /// marker line that [`Timeline::update_from_edited_text`] round-trips.
    pub fn text_content(&self, include_timestamps: bool) -> String {
        let active = self.active_segments();
        if include_timestamps {
            active
                .iter()
                .map(|s| format!("[{:.2}s - {:.2}s]\n{}", s.start_time, s.end_time, s.text))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            active
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    /// Re-derive `is_deleted` and `text` per segment from a line-oriented
    /// edit of [`Timeline::text_content`].
    ///
    /// Each segment is demarcated by a timestamp marker matched to its start
    /// time within [`MARKER_TOLERANCE_SECS`]. A matched segment whose
    /// reconstructed text is empty is marked deleted. Segments not named by
    /// any marker are reset to active and left untouched.
    pub fn update_from_edited_text(&mut self, edited_text: &str) {
        for segment in &mut self.segments {
            segment.is_deleted = false;
        }

        let mut updates: Vec<(usize, String)> = Vec::new();
        let mut current: Option<usize> = None;
        let mut parts: Vec<&str> = Vec::new();

        for line in edited_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(marker_start) = parse_marker_line(line) {
                if let Some(idx) = current.take() {
                    updates.push((idx, parts.join(" ")));
                }
                parts.clear();
                current = self
                    .segments
                    .iter()
                    .position(|s| (s.start_time - marker_start).abs() < MARKER_TOLERANCE_SECS);
            } else if current.is_some() {
                parts.push(line);
            }
        }
        if let Some(idx) = current {
            updates.push((idx, parts.join(" ")));
        }

        for (idx, text) in updates {
            let segment = &mut self.segments[idx];
            let text = text.trim().to_string();
            if text.is_empty() {
                segment.is_deleted = true;
            } else {
                segment.text = text;
            }
        }
    }

    /// Compute the merged time ranges of source media that survive editing.
    ///
    /// For each active segment the word-range reconciler maps the current
    /// (post-edit) text back onto original word timings; segments without
    /// word timings contribute their full span. The collected spans are
    /// sorted by start and merged with [`GAP_TOLERANCE_SECS`].
    pub fn active_time_ranges(&self) -> Vec<(f64, f64)> {
        let mut ranges = Vec::new();

        for segment in self.active_segments() {
            if segment.word_timings.is_empty() {
                ranges.push((segment.start_time, segment.end_time));
            } else {
                ranges.extend(segment.active_word_ranges(&segment.text));
            }
        }

        merge_ranges(ranges, GAP_TOLERANCE_SECS)
    }
}

/// Sort ranges by start and merge any pair closer than `tolerance`.
///
/// Returns a non-overlapping, time-ascending sequence; the merged end is the
/// max of the two ends. Empty input yields empty output.
pub fn merge_ranges(mut ranges: Vec<(f64, f64)>, tolerance: f64) -> Vec<(f64, f64)> {
    ranges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 + tolerance => {
                last.1 = last.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Parse a `[{start}s - {end}s]` marker line, returning the start time.
fn parse_marker_line(line: &str) -> Option<f64> {
    if !(line.starts_with('[') && line.ends_with(']') && line.contains("s -")) {
        return None;
    }
    let inner = &line[1..line.len() - 1];
    let start_str = inner.split("s -").next()?;
    start_str.trim().parse::<f64>().ok()
}
