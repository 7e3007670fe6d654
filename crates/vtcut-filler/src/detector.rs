//! Filler segment detection.

use regex::Regex;
use tracing::debug;

use vtcut_models::{Segment, Timeline, TrimConfig};

use crate::patterns::{default_patterns, FillerPattern};

/// Minimum duration for a valid (non-filler) segment, in seconds.
pub const MIN_SEGMENT_DURATION_SECS: f64 = 0.3;

/// Segments below this confidence are unconditionally filler.
pub const MIN_SEGMENT_CONFIDENCE: f64 = 0.3;

/// Default gap duration treated as an empty spot, in seconds.
pub const DEFAULT_SILENCE_THRESHOLD_SECS: f64 = 0.5;

/// Minimum confidence for the generic repeated-word check.
pub const REPEATED_WORD_CONFIDENCE: f64 = 0.8;

/// Filler word detection with pattern matching and context analysis.
///
/// Holds an ordered pattern table; detection walks it in order and the first
/// matching pattern wins. Custom words can be appended at runtime.
#[derive(Debug, Clone)]
pub struct FillerDetector {
    patterns: Vec<FillerPattern>,
    /// Minimum gap treated as an empty spot by [`FillerDetector::detect_empty_spots`]
    pub silence_threshold: f64,
    /// Segments shorter than this are unconditionally filler
    pub min_segment_duration: f64,
    whitespace: Regex,
    boundary_punct: Regex,
}

impl Default for FillerDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FillerDetector {
    pub fn new() -> Self {
        Self {
            patterns: default_patterns(),
            silence_threshold: DEFAULT_SILENCE_THRESHOLD_SECS,
            min_segment_duration: MIN_SEGMENT_DURATION_SECS,
            whitespace: Regex::new(r"\s+").expect("static pattern"),
            boundary_punct: Regex::new(r"\b[^\w\s]+\b").expect("static pattern"),
        }
    }

    /// Build a detector with the thresholds a trim configuration carries.
    pub fn from_config(config: &TrimConfig) -> Self {
        Self {
            silence_threshold: config.silence_threshold,
            min_segment_duration: config.min_segment_duration,
            ..Self::new()
        }
    }

    /// Append custom filler words as whole-word, case-insensitive patterns.
    pub fn add_custom_words<S: AsRef<str>>(&mut self, words: &[S]) {
        for word in words {
            self.patterns.push(FillerPattern::custom_word(word.as_ref()));
        }
    }

    /// The current pattern table, built-ins followed by custom words.
    pub fn patterns(&self) -> &[FillerPattern] {
        &self.patterns
    }

    /// Mark filler segments on the timeline in place.
    ///
    /// Only `is_filler` is touched; deletion stays a separate, user-driven
    /// decision.
    pub fn detect(&self, timeline: &mut Timeline) {
        let mut marked = 0usize;
        for segment in &mut timeline.segments {
            if self.is_filler_segment(segment) {
                segment.is_filler = true;
                marked += 1;
            }
        }
        debug!(
            segments = timeline.segments.len(),
            filler = marked,
            "filler detection complete"
        );
    }

    /// Decide whether one segment is filler speech.
    pub fn is_filler_segment(&self, segment: &Segment) -> bool {
        // Empty, too short or too uncertain: unconditionally filler.
        if segment.text.trim().is_empty() || segment.duration() < self.min_segment_duration {
            return true;
        }
        if segment.confidence < MIN_SEGMENT_CONFIDENCE {
            return true;
        }

        let normalized = self.normalize_text(&segment.text);

        for pattern in &self.patterns {
            if segment.confidence < pattern.confidence_threshold {
                continue;
            }
            if let Some(m) = pattern.pattern.find(&normalized) {
                // First confirmed match wins; a match its validator rejects
                // leaves later patterns in play.
                if pattern.validator.validate(&normalized, &m) {
                    return true;
                }
            }
        }

        if segment.confidence >= REPEATED_WORD_CONFIDENCE && has_adjacent_repetition(&normalized) {
            return true;
        }

        is_mostly_non_speech(&normalized)
    }

    /// Lowercase, collapse whitespace and strip stray inter-word punctuation.
    pub fn normalize_text(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let collapsed = self.whitespace.replace_all(lowered.trim(), " ");
        self.boundary_punct.replace_all(&collapsed, " ").into_owned()
    }

    /// First pattern description matching the segment text, for statistics
    /// attribution. Thresholds and context rules are not re-applied here.
    pub(crate) fn matched_description(&self, text: &str) -> Option<&str> {
        let normalized = self.normalize_text(text);
        self.patterns
            .iter()
            .find(|p| p.pattern.is_match(&normalized))
            .map(|p| p.description.as_str())
    }

    /// Report `(gap_start, gap_end)` for every adjacent pair of segments
    /// separated by at least `threshold` seconds (the detector default when
    /// `None`). Segments are considered in time-sorted order.
    pub fn detect_empty_spots(&self, timeline: &Timeline, threshold: Option<f64>) -> Vec<(f64, f64)> {
        let threshold = threshold.unwrap_or(self.silence_threshold);

        let mut sorted: Vec<&Segment> = timeline.segments.iter().collect();
        sorted.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        sorted
            .windows(2)
            .filter_map(|pair| {
                let gap = pair[1].start_time - pair[0].end_time;
                (gap >= threshold).then_some((pair[0].end_time, pair[1].start_time))
            })
            .collect()
    }
}

/// Whether any word immediately repeats ("really really", "went went").
///
/// Catches stutters the explicit repeated-word patterns do not enumerate.
fn has_adjacent_repetition(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.windows(2).any(|pair| pair[0] == pair[1])
}

/// Whether normalized text is mostly non-alphabetic noise.
fn is_mostly_non_speech(text: &str) -> bool {
    let alpha = text.chars().filter(|c| c.is_alphabetic()).count();
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return true;
    }
    (alpha as f64 / total as f64) < 0.5
}
