//! Complexity metrics for a single lyric text.
//!
//! # Normalization
//!
//! Bracketed annotations such as `[Chorus]` or `[Verse 2: Swae Lee]` are removed
//! and the remaining text trimmed. Empty text after normalization is treated
//! exactly like missing lyrics.
//!
//! # Counting rules
//!
//! - Words are runs of letters/digits, with inner apostrophes kept (`don't`).
//! - Uniqueness is case-folded, and typographic apostrophes fold to `'`.
//! - Sentences end at `.`, `!`, `?` or a line break; a lyric line is a sentence.
//!   Fragments with no words are not counted.
//! - Readability uses the Flesch reading-ease formula:
//!   `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)`.
//!   Lower is harder to read.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::syllables::{SyllableFn, SyllableHeuristic};
use crate::models::ComplexityMetrics;

static ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]\n]*\]").expect("annotation pattern is valid"));

static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*").expect("word pattern is valid")
});

const FRE_BASE: f64 = 206.835;
const FRE_SENTENCE_WEIGHT: f64 = 1.015;
const FRE_SYLLABLE_WEIGHT: f64 = 84.6;

/// Strip annotations and surrounding whitespace.
pub fn normalize_lyrics(lyrics: &str) -> String {
    ANNOTATION.replace_all(lyrics, "").trim().to_string()
}

fn is_sentence_break(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n' | '\r')
}

/// Computes [`ComplexityMetrics`] with a pluggable syllable heuristic.
#[derive(Debug, Clone, Copy)]
pub struct MetricCalculator {
    syllables: SyllableFn,
}

impl MetricCalculator {
    pub fn new(syllables: SyllableFn) -> Self {
        Self { syllables }
    }

    pub fn from_heuristic(heuristic: SyllableHeuristic) -> Self {
        Self::new(heuristic.counter())
    }

    /// Compute metrics. Never fails: absent or empty lyrics yield
    /// [`ComplexityMetrics::empty`].
    pub fn compute(&self, lyrics: Option<&str>) -> ComplexityMetrics {
        let Some(raw) = lyrics else {
            return ComplexityMetrics::empty();
        };

        let text = normalize_lyrics(raw);
        let words: Vec<&str> = WORD.find_iter(&text).map(|m| m.as_str()).collect();
        if words.is_empty() {
            return ComplexityMetrics::empty();
        }

        let word_count = words.len();
        let unique_word_count = words
            .iter()
            .map(|w| w.to_lowercase().replace('’', "'"))
            .collect::<HashSet<_>>()
            .len();

        let sentence_count = text
            .split(is_sentence_break)
            .filter(|fragment| WORD.is_match(fragment))
            .count();

        let syllable_count: usize = words.iter().map(|w| (self.syllables)(w)).sum();

        let avg_sentence_length = if sentence_count == 0 {
            0.0
        } else {
            word_count as f64 / sentence_count as f64
        };

        let syllables_per_word = syllable_count as f64 / word_count as f64;
        let score = FRE_BASE
            - FRE_SENTENCE_WEIGHT * avg_sentence_length
            - FRE_SYLLABLE_WEIGHT * syllables_per_word;

        ComplexityMetrics {
            word_count,
            unique_word_count,
            lexical_diversity: Some(unique_word_count as f64 / word_count as f64),
            flesch_kincaid_score: Some(score),
            avg_sentence_length,
        }
    }
}

impl Default for MetricCalculator {
    fn default() -> Self {
        Self::from_heuristic(SyllableHeuristic::default())
    }
}

/// Compute metrics with the default syllable heuristic.
pub fn compute_metrics(lyrics: Option<&str>) -> ComplexityMetrics {
    MetricCalculator::default().compute(lyrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::syllables::vowel_count;

    #[test]
    fn test_missing_lyrics() {
        let m = compute_metrics(None);
        assert_eq!(m.word_count, 0);
        assert_eq!(m.unique_word_count, 0);
        assert!(m.lexical_diversity.is_none());
        assert!(m.flesch_kincaid_score.is_none());
        assert_eq!(m.avg_sentence_length, 0.0);
    }

    #[test]
    fn test_empty_and_annotation_only_lyrics() {
        for text in ["", "   \n\t ", "[Chorus]\n[Verse 2: Swae Lee]\n"] {
            let m = compute_metrics(Some(text));
            assert_eq!(m, ComplexityMetrics::empty(), "text: {:?}", text);
        }
    }

    #[test]
    fn test_repeated_words() {
        let m = compute_metrics(Some("I love love love you"));
        assert_eq!(m.word_count, 5);
        assert_eq!(m.unique_word_count, 3);
        assert_eq!(m.lexical_diversity, Some(0.6));
        assert_eq!(m.avg_sentence_length, 5.0);

        // 5 words, 1 sentence, 5 syllables
        let expected = 206.835 - 1.015 * 5.0 - 84.6;
        assert!((m.flesch_kincaid_score.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_uniqueness_is_case_folded() {
        let m = compute_metrics(Some("Hello hello HELLO don't Don’t"));
        assert_eq!(m.word_count, 5);
        assert_eq!(m.unique_word_count, 2);
    }

    #[test]
    fn test_annotations_removed_before_counting() {
        let m = compute_metrics(Some("[Intro]\nOh my\n[Chorus]\nOh my"));
        assert_eq!(m.word_count, 4);
        assert_eq!(m.unique_word_count, 2);
        assert_eq!(m.avg_sentence_length, 2.0);
    }

    #[test]
    fn test_sentences_split_on_punctuation_and_lines() {
        let m = compute_metrics(Some("Stop. Go now! Why?\nBecause we can...\n\n"));
        // sentences: "Stop", "Go now", "Why", "Because we can"
        assert_eq!(m.word_count, 7);
        assert_eq!(m.avg_sentence_length, 7.0 / 4.0);
    }

    #[test]
    fn test_punctuation_is_not_a_word() {
        let m = compute_metrics(Some("-- ... !!"));
        assert_eq!(m.word_count, 0);
        assert!(m.lexical_diversity.is_none());
    }

    #[test]
    fn test_diversity_bounds() {
        let texts = [
            "la la la la",
            "every single word differs here",
            "This is a test song with some lyrics\nIt has multiple lines and some repetition",
        ];
        for text in texts {
            let m = compute_metrics(Some(text));
            assert!(m.unique_word_count <= m.word_count);
            let d = m.lexical_diversity.unwrap();
            assert!((0.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn test_multiline_example() {
        let lyrics = "
    This is a test song with some lyrics
    It has multiple lines and some repetition
    This is a test song with some lyrics
    It has multiple lines and some repetition
    ";
        let m = compute_metrics(Some(lyrics));
        assert_eq!(m.word_count, 30);
        assert_eq!(m.unique_word_count, 14);
        assert_eq!(m.lexical_diversity, Some(14.0 / 30.0));
        assert_eq!(m.avg_sentence_length, 7.5);
    }

    #[test]
    fn test_heuristic_changes_score_only() {
        let text = Some("Beautiful dancing monkey");
        let groups = MetricCalculator::default().compute(text);
        let counts = MetricCalculator::new(vowel_count).compute(text);

        assert_eq!(groups.word_count, counts.word_count);
        assert_eq!(groups.lexical_diversity, counts.lexical_diversity);
        assert_ne!(groups.flesch_kincaid_score, counts.flesch_kincaid_score);
    }

    #[test]
    fn test_pure_function() {
        let text = Some("Blinding lights\nI can't sleep until I feel your touch");
        assert_eq!(compute_metrics(text), compute_metrics(text));
    }
}
