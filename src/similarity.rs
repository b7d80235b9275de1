//! # Similarity Scoring Module
//!
//! Integer similarity scores in `0..=100` between normalized strings, plus the
//! keyword matcher shared by the allergen classifier and the quality filter.
//!
//! ## Scores
//!
//! - [`full_ratio`]: indel similarity `200 * LCS / (|a| + |b|)` over the whole
//!   strings, computed with `rapidfuzz`
//! - [`partial_ratio`]: best [`full_ratio`] of the shorter string against any
//!   aligned substring of the longer one
//!
//! Both are computed over Unicode scalar values and floored, so a score is
//! `>= t` exactly when the fractional score is `>= t` for any integer `t`.

use log::trace;
use rapidfuzz::distance::indel;
use serde::{Deserialize, Serialize};

/// Thresholds used by [`FuzzyMatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyThresholds {
    /// Whole-string and keyword-to-word comparisons
    pub strict: u8,
    /// Partial (substring alignment) comparisons
    pub loose: u8,
}

impl Default for FuzzyThresholds {
    fn default() -> Self {
        Self {
            strict: 86,
            loose: 92,
        }
    }
}

/// Indel ratio over character slices, floored to an integer
fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    // indel similarity is |a| + |b| - distance, i.e. twice the LCS length
    let shared = indel::similarity(a.iter().copied(), b.iter().copied());
    ((100 * shared) / total) as u8
}

/// Overall edit similarity between two strings
///
/// Two empty strings score 100; an empty string against a non-empty one
/// scores 0.
///
/// # Examples
///
/// ```rust
/// use menu_pipeline::similarity::full_ratio;
///
/// assert_eq!(full_ratio("mozzarella", "mozzarella"), 100);
/// assert_eq!(full_ratio("spaghetti alla carbonara", "spaghetti carbonara"), 88);
/// ```
pub fn full_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best alignment of the shorter string inside the longer one
///
/// Every full-length window of the longer string is scored, as well as the
/// windows that hang off either end. An empty shorter string scores 0 unless
/// both strings are empty.
///
/// # Examples
///
/// ```rust
/// use menu_pipeline::similarity::partial_ratio;
///
/// assert_eq!(partial_ratio("parmigiano", "parmigiano reggiano dop"), 100);
/// ```
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100 } else { 0 };
    }

    let n = short.len();
    let mut best = 0u8;
    for start in 0..=(long.len() - n) {
        best = best.max(ratio_chars(&short, &long[start..start + n]));
        if best == 100 {
            return best;
        }
    }
    for k in 1..n {
        best = best.max(ratio_chars(&short, &long[..k]));
        best = best.max(ratio_chars(&short, &long[long.len() - k..]));
    }
    best
}

/// How a keyword was recognized in a text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact substring
    Exact,
    /// Whole text similar to the keyword
    Full,
    /// One word of the text similar to the keyword
    Word,
    /// Keyword aligned inside the text
    Partial,
}

/// A keyword recognized in a text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatch<'k> {
    pub keyword: &'k str,
    pub score: u8,
    pub kind: MatchKind,
}

/// Decides whether a keyword occurs in a normalized text
///
/// A keyword matches when any of the following holds:
///
/// 1. it is longer than two characters and an exact substring of the text
/// 2. `full_ratio(keyword, text) >= strict`
/// 3. with word matching enabled, `full_ratio(keyword, word) >= strict` for
///    some word of the text
/// 4. the keyword is no longer than the text and
///    `partial_ratio(keyword, text) >= loose`
///
/// Callers pass already-normalized text and keywords.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatcher {
    thresholds: FuzzyThresholds,
    word_match: bool,
}

impl FuzzyMatcher {
    pub fn new(thresholds: FuzzyThresholds) -> Self {
        Self {
            thresholds,
            word_match: false,
        }
    }

    /// Also compare the keyword against each single word of the text
    pub fn with_word_match(mut self) -> Self {
        self.word_match = true;
        self
    }

    /// Score a single keyword against a text
    pub fn match_keyword(&self, text: &str, keyword: &str) -> Option<(u8, MatchKind)> {
        if keyword.is_empty() || text.is_empty() {
            return None;
        }
        if keyword.chars().count() > 2 && text.contains(keyword) {
            return Some((100, MatchKind::Exact));
        }

        let full = full_ratio(keyword, text);
        if full >= self.thresholds.strict {
            return Some((full, MatchKind::Full));
        }

        if self.word_match {
            if let Some(word_score) = text
                .split_whitespace()
                .map(|word| full_ratio(keyword, word))
                .find(|score| *score >= self.thresholds.strict)
            {
                return Some((word_score, MatchKind::Word));
            }
        }

        // a long keyword must not match inside a shorter text
        if keyword.chars().count() > text.chars().count() {
            return None;
        }
        let partial = partial_ratio(keyword, text);
        if partial >= self.thresholds.loose {
            return Some((partial, MatchKind::Partial));
        }
        None
    }

    /// First keyword, in list order, that matches the text
    pub fn find<'k, S: AsRef<str>>(&self, text: &str, keywords: &'k [S]) -> Option<FuzzyMatch<'k>> {
        keywords.iter().find_map(|keyword| {
            let keyword = keyword.as_ref();
            self.match_keyword(text, keyword).map(|(score, kind)| {
                trace!("Keyword '{}' matched '{}' ({:?}, {})", keyword, text, kind, score);
                FuzzyMatch {
                    keyword,
                    score,
                    kind,
                }
            })
        })
    }

    pub fn contains_any<S: AsRef<str>>(&self, text: &str, keywords: &[S]) -> bool {
        self.find(text, keywords).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_ratio_bounds() {
        assert_eq!(full_ratio("", ""), 100);
        assert_eq!(full_ratio("abc", ""), 0);
        assert_eq!(full_ratio("abc", "xyz"), 0);
        assert_eq!(full_ratio("pizza", "pizza"), 100);
    }

    #[test]
    fn test_full_ratio_floors() {
        // LCS("bevanda", "bevande") = 6, 2 * 6 / 14 = 85.7
        assert_eq!(full_ratio("bevanda", "bevande"), 85);
        // LCS = 4, 2 * 4 / 9 = 88.9
        assert_eq!(full_ratio("crea", "crema"), 88);
    }

    #[test]
    fn test_full_ratio_is_symmetric() {
        assert_eq!(
            full_ratio("mozzarela", "mozzarella"),
            full_ratio("mozzarella", "mozzarela")
        );
        assert_eq!(full_ratio("mozzarela", "mozzarella"), 94);
    }

    #[test]
    fn test_partial_ratio_embedded_keyword() {
        assert_eq!(partial_ratio("uova", "uova di quaglia"), 100);
        assert_eq!(partial_ratio("uova di quaglia", "uova"), 100);
        assert_eq!(partial_ratio("", ""), 100);
        assert_eq!(partial_ratio("", "abc"), 0);
    }

    #[test]
    fn test_partial_ratio_end_windows() {
        // prefix window "latt" of "lattuga" scores 2 * 4 / 9
        assert_eq!(partial_ratio("latte", "lattuga"), 88);
    }

    #[test]
    fn test_matcher_exact_requires_three_chars() {
        let matcher = FuzzyMatcher::default();
        assert_eq!(
            matcher.match_keyword("tonno e cipolla", "tonno"),
            Some((100, MatchKind::Exact))
        );
        // two-character keywords skip the substring rule and align partially
        assert_eq!(
            matcher.match_keyword("salame piccante", "am"),
            Some((100, MatchKind::Partial))
        );
    }

    #[test]
    fn test_matcher_word_level_typo() {
        let matcher = FuzzyMatcher::default().with_word_match();
        let found = matcher.match_keyword("mozzarela di bufala", "mozzarella");
        assert_eq!(found, Some((94, MatchKind::Word)));
    }

    #[test]
    fn test_word_match_is_opt_in() {
        let matcher = FuzzyMatcher::default();
        // full 40, partial 85: only the word rule would accept it
        assert_eq!(matcher.match_keyword("fetta biscottata", "feta"), None);
        assert_eq!(
            matcher.with_word_match().match_keyword("fetta biscottata", "feta").map(|(_, kind)| kind),
            Some(MatchKind::Word)
        );
    }

    #[test]
    fn test_partial_needs_keyword_no_longer_than_text() {
        let matcher = FuzzyMatcher::default();
        assert_eq!(partial_ratio("burro di arachidi", "burro"), 100);
        assert_eq!(matcher.match_keyword("burro", "burro di arachidi"), None);
        assert_eq!(
            matcher.match_keyword("burro di arachidi", "arachidi"),
            Some((100, MatchKind::Exact))
        );
    }

    #[test]
    fn test_matcher_find_returns_first_keyword() {
        let matcher = FuzzyMatcher::default();
        let keywords = vec!["gambero".to_string(), "gamberi".to_string()];
        let found = matcher.find("gamberi in tempura", &keywords).unwrap();
        assert_eq!(found.keyword, "gambero");
        assert_eq!(found.kind, MatchKind::Partial);
        assert!(!matcher.contains_any("insalata mista", &keywords));
    }

    #[test]
    fn test_matcher_empty_text() {
        let matcher = FuzzyMatcher::default();
        assert!(matcher.find("", &["pane"]).is_none());
    }
}
