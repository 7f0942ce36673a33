//! Answer confidence from retrieval similarity and question term coverage

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::config::SynthesisConfig;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "could", "did", "do",
    "does", "for", "from", "had", "has", "have", "how", "i", "if", "in", "into", "is", "it",
    "its", "me", "my", "of", "on", "or", "our", "should", "so", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "to", "was", "we", "were", "what",
    "when", "where", "which", "who", "whom", "why", "will", "with", "would", "you", "your",
    "about", "tell", "please", "any", "all",
];

/// Lowercased content words of a question, in order, without duplicates
pub fn key_terms(question: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    question
        .unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Lowercased word set of a text
pub fn word_set(text: &str) -> HashSet<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Fraction of `terms` present in `context`; `None` when there are no terms
pub fn coverage(terms: &[String], context: &str) -> Option<f32> {
    if terms.is_empty() {
        return None;
    }
    let words = word_set(context);
    let found = terms.iter().filter(|t| words.contains(t.as_str())).count();
    Some(found as f32 / terms.len() as f32)
}

/// Blends mean similarity with key-term coverage.
///
/// The result grows with every contributing similarity, all else equal,
/// and always lies in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
    similarity_weight: f32,
    coverage_weight: f32,
}

impl ConfidenceScorer {
    pub fn new(similarity_weight: f32, coverage_weight: f32) -> Self {
        Self {
            similarity_weight,
            coverage_weight,
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self::new(config.similarity_weight, config.coverage_weight)
    }

    /// Score from the similarities of the chunks in the context and the term coverage
    pub fn score(&self, similarities: &[f32], coverage: Option<f32>) -> f32 {
        if similarities.is_empty() {
            return 0.0;
        }

        let mean = similarities.iter().map(|s| s.clamp(0.0, 1.0)).sum::<f32>()
            / similarities.len() as f32;

        let blended = match coverage {
            Some(coverage) => {
                let total = self.similarity_weight + self.coverage_weight;
                (self.similarity_weight * mean + self.coverage_weight * coverage.clamp(0.0, 1.0))
                    / total
            }
            None => mean,
        };

        if blended.is_finite() {
            blended.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_terms_drop_stopwords() {
        assert_eq!(key_terms("When is the meeting?"), vec!["meeting"]);
        assert_eq!(
            key_terms("Where is Room 4, room 4?"),
            vec!["room".to_string(), "4".to_string()]
        );
        assert!(key_terms("what is it?").is_empty());
    }

    #[test]
    fn test_coverage() {
        let terms = key_terms("meeting room budget");
        let c = coverage(&terms, "The meeting is in Room 4.").unwrap();
        assert!((c - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(coverage(&[], "anything"), None);
    }

    #[test]
    fn test_score_bounds() {
        let scorer = ConfidenceScorer::default();
        assert_eq!(scorer.score(&[], Some(1.0)), 0.0);
        assert!((scorer.score(&[1.0], Some(1.0)) - 1.0).abs() < 1e-6);
        assert_eq!(scorer.score(&[-0.5], Some(0.0)), 0.0);
        assert!((scorer.score(&[0.6], None) - 0.6).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_score_monotonic_in_similarity(
            sims in prop::collection::vec(0.0f32..1.0, 1..8),
            idx_seed in 0usize..8,
            bump in 0.0f32..0.5,
            coverage in prop::option::of(0.0f32..1.0),
        ) {
            let scorer = ConfidenceScorer::default();
            let idx = idx_seed % sims.len();
            let mut higher = sims.clone();
            higher[idx] = (higher[idx] + bump).min(1.0);

            let base = scorer.score(&sims, coverage);
            let raised = scorer.score(&higher, coverage);

            prop_assert!(raised >= base);
            prop_assert!((0.0..=1.0).contains(&raised));
        }
    }
}
