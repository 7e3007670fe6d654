//! Filler statistics and advisory suggestions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use vtcut_models::Timeline;

use crate::detector::FillerDetector;

/// Aggregate filler statistics for one timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerStats {
    pub total_segments: usize,
    pub filler_segments: usize,
    /// Share of segments marked filler, 0-100
    pub filler_percentage: f64,
    /// Source media duration in seconds
    pub total_duration: f64,
    /// Summed duration of filler segments in seconds
    pub filler_duration: f64,
    /// Share of media time taken by fillers, 0-100
    pub filler_time_percentage: f64,
    /// First-match attribution: pattern description -> filler segment count
    pub filler_types: HashMap<String, usize>,
    /// Gaps between adjacent segments at least the silence threshold long
    pub empty_spots: Vec<(f64, f64)>,
}

impl FillerDetector {
    /// Aggregate counts, percentages and per-pattern attribution for the
    /// timeline's current `is_filler` flags.
    pub fn statistics(&self, timeline: &Timeline) -> FillerStats {
        let total_segments = timeline.segments.len();
        let filler_segments = timeline.segments.iter().filter(|s| s.is_filler).count();

        let total_duration = timeline.total_duration;
        let filler_duration: f64 = timeline
            .segments
            .iter()
            .filter(|s| s.is_filler)
            .map(|s| s.duration())
            .sum();

        let mut filler_types: HashMap<String, usize> = HashMap::new();
        for segment in timeline.segments.iter().filter(|s| s.is_filler) {
            if let Some(description) = self.matched_description(&segment.text) {
                *filler_types.entry(description.to_string()).or_insert(0) += 1;
            }
        }

        FillerStats {
            total_segments,
            filler_segments,
            filler_percentage: percentage(filler_segments as f64, total_segments as f64),
            total_duration,
            filler_duration,
            filler_time_percentage: percentage(filler_duration, total_duration),
            filler_types,
            empty_spots: self.detect_empty_spots(timeline, None),
        }
    }

    /// Advisory text derived from the statistics thresholds.
    pub fn suggestions(&self, timeline: &Timeline) -> Vec<String> {
        let stats = self.statistics(timeline);
        let mut suggestions = Vec::new();

        if stats.filler_percentage > 30.0 {
            suggestions.push(
                "High filler word usage detected. Consider practicing speech without fillers."
                    .to_string(),
            );
        }
        if stats.filler_time_percentage > 20.0 {
            suggestions.push(
                "Filler words take up significant time. Removing them will greatly shorten the video."
                    .to_string(),
            );
        }
        if stats.empty_spots.len() > 5 {
            suggestions
                .push("Multiple silent gaps detected. Consider removing long pauses.".to_string());
        }
        if let Some((description, count)) = stats
            .filler_types
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        {
            suggestions.push(format!(
                "Most common filler type: {description} ({count} occurrences)"
            ));
        }

        suggestions
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtcut_models::Segment;

    #[test]
    fn test_statistics_percentages() {
        // Durations [1, 1, 2] with only the middle segment filler.
        let mut segments = vec![
            Segment::new(1, 0.0, 1.0, "welcome everyone", 0.95),
            Segment::new(2, 1.0, 2.0, "um", 0.95),
            Segment::new(3, 2.0, 4.0, "to the presentation", 0.95),
        ];
        segments[1].is_filler = true;
        let timeline = Timeline::new(segments, 4.0, "test.mp4");

        let detector = FillerDetector::new();
        let stats = detector.statistics(&timeline);

        assert_eq!(stats.total_segments, 3);
        assert_eq!(stats.filler_segments, 1);
        assert!((stats.filler_percentage - 33.33).abs() < 0.1);
        assert!((stats.filler_duration - 1.0).abs() < 1e-9);
        assert!((stats.filler_time_percentage - 25.0).abs() < 0.1);
        assert_eq!(stats.filler_types.get("Basic 'um' filler"), Some(&1));
    }

    #[test]
    fn test_statistics_empty_timeline() {
        let timeline = Timeline::new(Vec::new(), 0.0, "empty.mp4");
        let stats = FillerDetector::new().statistics(&timeline);

        assert_eq!(stats.total_segments, 0);
        assert!(stats.filler_percentage.abs() < f64::EPSILON);
        assert!(stats.filler_time_percentage.abs() < f64::EPSILON);
        assert!(stats.empty_spots.is_empty());
    }

    #[test]
    fn test_suggestions_thresholds() {
        let mut segments = vec![
            Segment::new(1, 0.0, 1.0, "um", 0.95),
            Segment::new(2, 1.0, 2.0, "uh", 0.95),
            Segment::new(3, 2.0, 3.0, "actual speech", 0.95),
        ];
        segments[0].is_filler = true;
        segments[1].is_filler = true;
        let timeline = Timeline::new(segments, 3.0, "test.mp4");

        let detector = FillerDetector::new();
        let suggestions = detector.suggestions(&timeline);

        // 66% of segments and 66% of time are filler: both warnings fire.
        assert!(suggestions.iter().any(|s| s.contains("High filler word usage")));
        assert!(suggestions.iter().any(|s| s.contains("significant time")));
        assert!(suggestions.iter().any(|s| s.starts_with("Most common filler type:")));
    }

    #[test]
    fn test_suggestions_quiet_timeline() {
        let timeline = Timeline::new(
            vec![Segment::new(1, 0.0, 5.0, "a long clean take", 0.95)],
            5.0,
            "test.mp4",
        );
        let suggestions = FillerDetector::new().suggestions(&timeline);
        assert!(suggestions.is_empty());
    }
}
