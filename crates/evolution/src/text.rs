//! Word tokenization shared by the classifiers and similarity measures.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn word_pattern() -> Option<&'static Regex> {
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\b\w+\b").ok()).as_ref()
}

/// Lowercased word tokens in order of appearance.
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    match word_pattern() {
        Some(re) => re.find_iter(&lower).map(|m| m.as_str().to_string()).collect(),
        None => lower
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Distinct lowercased word tokens.
pub fn word_set(text: &str) -> HashSet<String> {
    words(text).into_iter().collect()
}

/// Whether an indicator occurs in `text`.
///
/// Plain word indicators must match a whole token; anything containing
/// punctuation ("?", "let's", "self-esteem") is matched as a substring.
pub fn has_indicator(lower: &str, tokens: &HashSet<String>, indicator: &str) -> bool {
    if indicator.chars().all(char::is_alphanumeric) {
        tokens.contains(indicator)
    } else {
        lower.contains(indicator)
    }
}

/// Jaccard similarity of two texts' word sets.
///
/// Two empty texts are identical; one empty text shares nothing.
pub fn jaccard(a: &str, b: &str) -> f64 {
    jaccard_sets(&word_set(a), &word_set(b))
}

/// Jaccard similarity of two precomputed word sets.
pub fn jaccard_sets(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => {
            let shared = a.intersection(b).count();
            let union = a.union(b).count();
            shared as f64 / union as f64
        }
    }
}
