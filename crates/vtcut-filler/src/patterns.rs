//! Filler pattern table and context validators.

use regex::{Match, Regex};

/// How a pattern match is confirmed against its surrounding context.
///
/// Context-sensitive words ("like", "you know") are only fillers in some
/// positions; each kind is a pure function of the normalized text and the
/// match span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextValidator {
    /// Any match is a filler
    Always,
    /// Filler when it opens the segment, precedes another filler cue, or the
    /// segment is at most two words
    Like,
    /// Filler when nothing meaningful follows it or the segment is at most
    /// four words
    YouKnow,
    /// Exclamation sounds ("ah"/"oh"): filler only in segments of at most
    /// two words
    Exclamation,
    /// Default for context-sensitive patterns: filler in segments of at most
    /// three words
    ShortSegment,
}

impl ContextValidator {
    /// Decide whether a match constitutes filler speech.
    pub fn validate(self, text: &str, m: &Match<'_>) -> bool {
        let word_count = text.split_whitespace().count();
        match self {
            ContextValidator::Always => true,
            ContextValidator::Like => {
                if text[..m.start()].trim().is_empty() {
                    return true;
                }
                let next = text[m.end()..].split_whitespace().next();
                if matches!(next, Some("uh" | "um" | "you" | "i")) {
                    return true;
                }
                word_count <= 2
            }
            ContextValidator::YouKnow => {
                let after = text[m.end()..].trim();
                after.split_whitespace().count() <= 1 || word_count <= 4
            }
            ContextValidator::Exclamation => word_count <= 2,
            ContextValidator::ShortSegment => word_count <= 3,
        }
    }
}

/// A named filler pattern with its detection rules.
#[derive(Debug, Clone)]
pub struct FillerPattern {
    /// Compiled text pattern, matched against normalized segment text
    pub pattern: Regex,
    /// Segments below this confidence skip the pattern entirely
    pub confidence_threshold: f64,
    /// Context rule confirming a match
    pub validator: ContextValidator,
    /// Human-readable description, used for statistics attribution
    pub description: String,
}

impl FillerPattern {
    fn new(pattern: &str, confidence_threshold: f64, validator: ContextValidator, description: &str) -> Self {
        Self {
            // Table patterns are static and known-valid.
            pattern: Regex::new(pattern).expect("invalid built-in filler pattern"),
            confidence_threshold,
            validator,
            description: description.to_string(),
        }
    }

    /// Compile a caller-supplied filler word into a whole-word,
    /// case-insensitive, context-free pattern.
    pub fn custom_word(word: &str) -> Self {
        let escaped = regex::escape(&word.to_lowercase());
        Self {
            pattern: Regex::new(&format!(r"(?i)\b{escaped}\b"))
                .expect("escaped literal is a valid pattern"),
            confidence_threshold: 0.8,
            validator: ContextValidator::Always,
            description: format!("Custom filler word: '{word}'"),
        }
    }
}

/// The built-in pattern table, evaluated in order; first match wins.
pub fn default_patterns() -> Vec<FillerPattern> {
    use ContextValidator::*;

    vec![
        // Basic filler words
        FillerPattern::new(r"(?i)\buh+\b", 0.9, Always, "Basic 'uh' filler"),
        FillerPattern::new(r"(?i)\bum+\b", 0.9, Always, "Basic 'um' filler"),
        FillerPattern::new(r"(?i)\buhmm?\b", 0.9, Always, "'Uhm' variations"),
        FillerPattern::new(r"(?i)\buhh+\b", 0.9, Always, "Extended 'uh' sounds"),
        // Extended filler sounds
        FillerPattern::new(r"(?i)\bah+\b", 0.8, Exclamation, "'Ah' hesitation sounds"),
        FillerPattern::new(r"(?i)\boh+\b", 0.7, Exclamation, "'Oh' hesitation sounds"),
        FillerPattern::new(r"(?i)\beh+\b", 0.8, Always, "'Eh' filler sounds"),
        FillerPattern::new(r"(?i)\bmm+\b", 0.8, Always, "'Mm' thinking sounds"),
        FillerPattern::new(r"(?i)\bhmm+\b", 0.8, Always, "'Hmm' thinking sounds"),
        // Repetitive phrases
        FillerPattern::new(r"(?i)\blike\s+like\b", 0.8, Like, "Repeated 'like'"),
        FillerPattern::new(r"(?i)\byou know\s+you know\b", 0.8, YouKnow, "Repeated 'you know'"),
        FillerPattern::new(r"(?i)\bi mean\s+i mean\b", 0.8, ShortSegment, "Repeated 'I mean'"),
        // Common filler phrases
        FillerPattern::new(r"(?i)\byou know\b", 0.7, YouKnow, "'You know' filler phrase"),
        FillerPattern::new(r"(?i)\bi mean\b", 0.7, ShortSegment, "'I mean' filler phrase"),
        FillerPattern::new(r"(?i)\blike\b", 0.6, Like, "Standalone 'like'"),
        FillerPattern::new(r"(?i)\bso\s+(?:uh|um|like|you know)\b", 0.7, ShortSegment, "'So' before fillers"),
        FillerPattern::new(r"(?i)\bwell\s+(?:uh|um|like)\b", 0.7, ShortSegment, "'Well' before fillers"),
        // False starts and corrections
        FillerPattern::new(r"(?i)\bi\s+i\b", 0.8, Always, "Repeated 'I'"),
        FillerPattern::new(r"(?i)\bthe\s+the\b", 0.8, Always, "Repeated 'the'"),
        FillerPattern::new(r"(?i)\band\s+and\b", 0.8, Always, "Repeated 'and'"),
        // Breathing and mouth sounds
        FillerPattern::new(r"\*[^*]*\*", 0.9, Always, "Marked non-speech sounds"),
        FillerPattern::new(r"\[.*?\]", 0.9, Always, "Bracketed non-speech sounds"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match<'t>(pattern: &FillerPattern, text: &'t str) -> Match<'t> {
        pattern.pattern.find(text).expect("pattern should match")
    }

    #[test]
    fn test_default_patterns_compile() {
        let patterns = default_patterns();
        assert!(patterns.len() > 20);
    }

    #[test]
    fn test_like_validator_opening_position() {
        let patterns = default_patterns();
        let like = patterns
            .iter()
            .find(|p| p.description == "Standalone 'like'")
            .unwrap();

        let text = "like this approach works well for everyone";
        let m = first_match(like, text);
        assert!(ContextValidator::Like.validate(text, &m));

        let text = "something that looks like a good plan overall";
        let m = first_match(like, text);
        assert!(!ContextValidator::Like.validate(text, &m));
    }

    #[test]
    fn test_like_validator_followed_by_filler_cue() {
        let text = "it was like um really strange";
        let patterns = default_patterns();
        let like = patterns
            .iter()
            .find(|p| p.description == "Standalone 'like'")
            .unwrap();
        let m = first_match(like, text);
        assert!(ContextValidator::Like.validate(text, &m));
    }

    #[test]
    fn test_you_know_validator_trailing() {
        let patterns = default_patterns();
        let you_know = patterns
            .iter()
            .find(|p| p.description == "'You know' filler phrase")
            .unwrap();

        let text = "this part is really important you know";
        let m = first_match(you_know, text);
        assert!(ContextValidator::YouKnow.validate(text, &m));

        let text = "you know the answer to that question already today";
        let m = first_match(you_know, text);
        assert!(!ContextValidator::YouKnow.validate(text, &m));
    }

    #[test]
    fn test_exclamation_validator_short_segments_only() {
        let patterns = default_patterns();
        let ah = patterns
            .iter()
            .find(|p| p.description == "'Ah' hesitation sounds")
            .unwrap();

        let m = first_match(ah, "ah");
        assert!(ContextValidator::Exclamation.validate("ah", &m));

        let text = "ah yes that makes a lot of sense";
        let m = first_match(ah, text);
        assert!(!ContextValidator::Exclamation.validate(text, &m));
    }

    #[test]
    fn test_custom_word_escapes_special_characters() {
        let pattern = FillerPattern::custom_word("y'all");
        assert!(pattern.pattern.is_match("see y'all later"));
        assert_eq!(pattern.validator, ContextValidator::Always);
    }

    #[test]
    fn test_custom_word_whole_word_only() {
        let pattern = FillerPattern::custom_word("basically");
        assert!(pattern.pattern.is_match("basically"));
        assert!(pattern.pattern.is_match("Basically yes"));
        assert!(!pattern.pattern.is_match("basic"));
    }
}
