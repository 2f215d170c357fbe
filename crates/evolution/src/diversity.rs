//! Population pattern analysis and advisory offspring scoring.

use crate::profile::{classify, PerformanceProfile, StructureFeatures};
use crate::text::{jaccard_sets, word_set, words};
use promptevo_core::{Candidate, OffspringScore};
use serde::{Deserialize, Serialize};

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "to", "of", "for", "in", "on", "at", "by", "with", "as",
    "is", "are", "be", "you", "your", "who", "that", "this", "it", "their", "them", "they", "i",
    "me", "my", "from", "into", "while",
];

const THEMES: &[&str] = &["practical", "supportive", "confidence", "social"];

/// Patterns that are overrepresented in the recent population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationPatterns {
    /// Content words used more than once, most frequent first
    pub common_words: Vec<String>,
    /// Opening structures used more than once
    pub common_structures: Vec<String>,
    /// Thematic buckets used more than once
    pub common_themes: Vec<String>,
    /// Number of texts analyzed
    pub sample_size: usize,
}

impl PopulationPatterns {
    /// Analyze texts, oldest first.
    pub fn analyze<S: AsRef<str>>(texts: &[S]) -> Self {
        let mut word_counts = Counter::default();
        let mut structure_counts = Counter::default();
        let mut theme_counts = Counter::default();

        for text in texts {
            let text = text.as_ref();
            let lower = text.to_lowercase();

            for word in words(text) {
                if !STOPWORDS.contains(&word.as_str()) {
                    word_counts.add(&word);
                }
            }

            let structure = if text.starts_with("Be ") {
                Some("Be + adjective")
            } else if text.contains('?') {
                Some("Question format")
            } else if lower.contains("help") {
                Some("Help-focused")
            } else if lower.contains("guide") {
                Some("Guide-focused")
            } else {
                None
            };
            if let Some(structure) = structure {
                structure_counts.add(structure);
            }

            for theme in THEMES {
                if lower.contains(theme) {
                    theme_counts.add(theme);
                }
            }
        }

        Self {
            common_words: word_counts.repeated(10),
            common_structures: structure_counts.repeated(5),
            common_themes: theme_counts.repeated(5),
            sample_size: texts.len(),
        }
    }

    /// Whether nothing was analyzed.
    pub fn is_empty(&self) -> bool {
        self.sample_size == 0
    }
}

/// Texts of the most recent `window` non-fallback candidates, oldest first.
pub fn recent_texts(population: &[Candidate], window: usize) -> Vec<String> {
    let texts: Vec<&Candidate> = population.iter().filter(|c| !c.fallback).collect();
    let start = texts.len().saturating_sub(window);
    texts[start..].iter().map(|c| c.text.clone()).collect()
}

/// Insertion-ordered frequency counter. Ties keep first-seen order.
#[derive(Default)]
struct Counter {
    entries: Vec<(String, usize)>,
}

impl Counter {
    fn add(&mut self, key: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    fn repeated(mut self, limit: usize) -> Vec<String> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
            .into_iter()
            .take(limit)
            .filter(|(_, n)| *n > 1)
            .map(|(k, _)| k)
            .collect()
    }
}

/// How different `child` is from `existing`: `1 - mean Jaccard`, floored at 0.
///
/// Returns 1.0 when there is nothing to compare against.
pub fn diversity_score<S: AsRef<str>>(child: &str, existing: &[S]) -> f64 {
    if existing.is_empty() {
        return 1.0;
    }
    let child_words = word_set(child);
    let total: f64 = existing
        .iter()
        .map(|e| jaccard_sets(&child_words, &word_set(e.as_ref())))
        .sum();
    (1.0 - total / existing.len() as f64).max(0.0)
}

/// How well `child` keeps what made its parents perform.
pub fn performance_score(child: &str, p1: &PerformanceProfile, p2: &PerformanceProfile) -> f64 {
    let preservation = |profile: &PerformanceProfile| {
        if profile.contributing.is_empty() {
            return 0.0;
        }
        let kept = profile.contributing.iter().filter(|a| a.present_in(child)).count();
        kept as f64 / profile.contributing.len() as f64
    };

    let analysis = classify(child);
    let approach_match = |profile: &PerformanceProfile| {
        if analysis.dominant == profile.analysis.dominant {
            1.0
        } else {
            0.5
        }
    };
    let structure = analysis.structure.agreement(&p1.analysis.structure) as f64
        / StructureFeatures::COUNT as f64;
    let style = (approach_match(p1) + approach_match(p2) + structure) / 3.0;

    ((preservation(p1) + preservation(p2) + style) / 3.0).min(1.0)
}

/// Advisory performance/diversity score for an offspring.
pub fn score_offspring<S: AsRef<str>>(
    child: &str,
    p1: &PerformanceProfile,
    p2: &PerformanceProfile,
    existing: &[S],
) -> OffspringScore {
    OffspringScore::new(performance_score(child, p1, p2), diversity_score(child, existing))
}
