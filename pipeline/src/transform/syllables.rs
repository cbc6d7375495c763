//! Syllable estimation heuristics.
//!
//! The readability score needs a syllable total. Both heuristics here are
//! approximations; results differ between them, so the heuristic in use is
//! part of the configuration and should be reported alongside scores.
//!
//! - [`vowel_groups`] (default): count runs of consecutive vowels (`y` included),
//!   drop one for a silent trailing `e`, never below one per word.
//! - [`vowel_count`]: count every vowel letter. Overestimates diphthongs.

use serde::{Deserialize, Serialize};

/// A function from one word to its estimated syllable count.
pub type SyllableFn = fn(&str) -> usize;

/// Named heuristics selectable from configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyllableHeuristic {
    #[default]
    VowelGroups,
    VowelCount,
}

impl SyllableHeuristic {
    pub fn counter(&self) -> SyllableFn {
        match self {
            Self::VowelGroups => vowel_groups,
            Self::VowelCount => vowel_count,
        }
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Words without letters: numbers still take time to sing, bare symbols don't.
fn letterless(word: &str) -> usize {
    if word.chars().any(|c| c.is_alphanumeric()) {
        1
    } else {
        0
    }
}

/// Vowel-group heuristic.
pub fn vowel_groups(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();

    if letters.is_empty() {
        return letterless(word);
    }

    let mut groups = 0;
    let mut in_group = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !in_group {
            groups += 1;
        }
        in_group = vowel;
    }

    // Silent trailing 'e' ("love", "time"), but not "-le" after a consonant ("little").
    let n = letters.len();
    if groups > 1 && letters[n - 1] == 'e' {
        let consonant_le = n >= 3 && letters[n - 2] == 'l' && !is_vowel(letters[n - 3]);
        let vowel_before = is_vowel(letters[n - 2]);
        if !consonant_le && !vowel_before {
            groups -= 1;
        }
    }

    groups.max(1)
}

/// Raw vowel count, minimum one for any word with letters or digits.
pub fn vowel_count(word: &str) -> usize {
    let mut letters = 0;
    let mut vowels = 0;
    for c in word.chars().filter(|c| c.is_alphabetic()).flat_map(char::to_lowercase) {
        letters += 1;
        if matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') {
            vowels += 1;
        }
    }
    if letters == 0 {
        letterless(word)
    } else {
        vowels.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vowel_groups_simple_words() {
        assert_eq!(vowel_groups("I"), 1);
        assert_eq!(vowel_groups("you"), 1);
        assert_eq!(vowel_groups("love"), 1);
        assert_eq!(vowel_groups("dancing"), 2);
        assert_eq!(vowel_groups("monkey"), 2);
        assert_eq!(vowel_groups("beautiful"), 3);
    }

    #[test]
    fn test_vowel_groups_trailing_e() {
        assert_eq!(vowel_groups("time"), 1);
        assert_eq!(vowel_groups("little"), 2);
        assert_eq!(vowel_groups("free"), 1);
        assert_eq!(vowel_groups("the"), 1);
    }

    #[test]
    fn test_vowel_groups_case_and_apostrophes() {
        assert_eq!(vowel_groups("DON'T"), 1);
        assert_eq!(vowel_groups("Shallow"), 2);
    }

    #[test]
    fn test_vowel_groups_non_letters() {
        assert_eq!(vowel_groups("2020"), 1);
        assert_eq!(vowel_groups("--"), 0);
    }

    #[test]
    fn test_vowel_count() {
        assert_eq!(vowel_count("beautiful"), 5);
        assert_eq!(vowel_count("rhythm"), 1);
    }

    #[test]
    fn test_heuristics_agree_on_non_letters() {
        for word in ["42", "2020", "--", "!"] {
            assert_eq!(vowel_count(word), vowel_groups(word), "{}", word);
        }
        assert_eq!(vowel_count("42"), 1);
        assert_eq!(vowel_count("--"), 0);
    }

    #[test]
    fn test_heuristic_selection() {
        assert_eq!(SyllableHeuristic::default(), SyllableHeuristic::VowelGroups);
        assert_eq!((SyllableHeuristic::VowelCount.counter())("beautiful"), 5);
        assert_eq!((SyllableHeuristic::VowelGroups.counter())("beautiful"), 3);
    }
}
