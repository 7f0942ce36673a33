//! Heuristic generator that answers with sentences taken from the passages

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::generation::confidence::{key_terms, word_set};
use crate::generation::Prompt;

use super::llm::LlmProvider;

/// Answers with the passage sentences that mention the most question terms.
///
/// Sentences are copied verbatim, so the answer never contains text that is
/// not in the context.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    /// Upper bound on sentences in an answer
    max_sentences: usize,
}

impl ExtractiveGenerator {
    pub fn new() -> Self {
        Self { max_sentences: 3 }
    }

    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences.max(1);
        self
    }

    /// Pick answer sentences; ties keep passage order
    fn select(&self, prompt: &Prompt) -> Option<String> {
        let terms = key_terms(&prompt.question);

        // (score, order, sentence)
        let mut candidates: Vec<(usize, usize, &str)> = prompt
            .passages
            .iter()
            .flat_map(|p| p.text.unicode_sentences())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(order, sentence)| {
                let words = word_set(sentence);
                let score = terms.iter().filter(|t| words.contains(t.as_str())).count();
                (score, order, sentence)
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let best = candidates.iter().map(|c| c.0).max().unwrap_or(0);
        if best == 0 {
            // No term overlap: fall back to the opening of the top passage
            return candidates.first().map(|c| c.2.to_string());
        }

        candidates.retain(|c| c.0 == best);
        candidates.truncate(self.max_sentences);

        Some(
            candidates
                .into_iter()
                .map(|c| c.2)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for ExtractiveGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.select(prompt)
            .ok_or_else(|| Error::MalformedResponse("no passage text to answer from".to_string()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "extractive"
    }

    fn model(&self) -> &str {
        "sentence-selection"
    }
}
