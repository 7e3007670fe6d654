//! Transcript segments and word-level timing.

use serde::{Deserialize, Serialize};

/// Timing information for a single transcribed word.
///
/// Produced by the transcription collaborator and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    /// The word as transcribed
    pub word: String,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds (always greater than `start_time`)
    pub end_time: f64,
    /// Recognition confidence (0.0-1.0), informational only
    pub confidence: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start_time: f64, end_time: f64, confidence: f64) -> Self {
        Self {
            word: word.into(),
            start_time,
            end_time,
            confidence,
        }
    }
}

/// A single timestamped span of transcript text.
///
/// `is_filler`, `is_deleted` and `text` are the only fields mutated after
/// creation: the filler detector marks fillers, edit reconciliation rewrites
/// text and deletion flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Unique id, assigned in emission order
    pub id: u64,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds (always greater than `start_time`)
    pub end_time: f64,
    /// Transcript text, possibly edited
    pub text: String,
    /// Recognition confidence (0.0-1.0)
    pub confidence: f64,
    /// Marked by the filler detector
    #[serde(default)]
    pub is_filler: bool,
    /// Marked by edit reconciliation
    #[serde(default)]
    pub is_deleted: bool,
    /// Word-level sub-timings (may be empty)
    #[serde(default)]
    pub word_timings: Vec<WordTiming>,
}

impl Segment {
    pub fn new(id: u64, start_time: f64, end_time: f64, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            id,
            start_time,
            end_time,
            text: text.into(),
            confidence,
            is_filler: false,
            is_deleted: false,
            word_timings: Vec::new(),
        }
    }

    /// Attach word timings, builder style.
    pub fn with_word_timings(mut self, word_timings: Vec<WordTiming>) -> Self {
        self.word_timings = word_timings;
        self
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Recover the time ranges of original words that survive in the edited
    /// text, so trimming can operate at word granularity.
    ///
    /// Both texts are normalized to lowercase whitespace tokens. The edited
    /// token sequence is walked left to right; each token is anchored at its
    /// next occurrence in the original sequence and the run is extended while
    /// subsequent tokens keep matching positionally. Unmatched tokens emit no
    /// range: a deleted or rewritten word has no valid original timing.
    ///
    /// When the segment carries no word timings the whole span is kept if the
    /// edited text is a substring of the original, otherwise nothing is.
    pub fn active_word_ranges(&self, edited_text: &str) -> Vec<(f64, f64)> {
        if self.word_timings.is_empty() {
            let edited = edited_text.trim().to_lowercase();
            if self.text.to_lowercase().contains(&edited) {
                return vec![(self.start_time, self.end_time)];
            }
            return Vec::new();
        }

        let edited: Vec<String> = edited_text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let original: Vec<String> = self
            .word_timings
            .iter()
            .map(|wt| wt.word.to_lowercase())
            .collect();

        let mut ranges = Vec::new();
        let mut i = 0;
        while i < edited.len() {
            // Anchor search starts at the edited cursor, wrapping to the
            // front once the cursor runs past the original sequence.
            let search_from = if i < original.len() { i } else { 0 };
            let anchor = original[search_from..]
                .iter()
                .position(|w| *w == edited[i])
                .map(|p| p + search_from);

            let Some(start_idx) = anchor else {
                // Word not found in the original, skip it.
                i += 1;
                continue;
            };

            let mut end_idx = start_idx;
            let mut j = i + 1;
            while j < edited.len() && end_idx + 1 < original.len() && edited[j] == original[end_idx + 1] {
                end_idx += 1;
                j += 1;
            }

            ranges.push((
                self.word_timings[start_idx].start_time,
                self.word_timings[end_idx].end_time,
            ));
            i = j;
        }

        ranges
    }
}
