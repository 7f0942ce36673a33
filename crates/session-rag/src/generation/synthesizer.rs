//! Grounded answer synthesis with confidence scoring and degraded fallback

use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::{Answer, ScoredChunk};

use super::citation::citation_for;
use super::confidence::{coverage, key_terms, ConfidenceScorer};
use super::prompt::{Prompt, PromptBuilder, PromptPassage};

/// Turns retrieved chunks into an answer.
///
/// Never fails: when the generator times out, errors or returns nothing, the
/// highest-ranked passage is returned verbatim with a reduced confidence and
/// `degraded` set.
pub struct AnswerSynthesizer {
    generator: Arc<dyn LlmProvider>,
    scorer: ConfidenceScorer,
    context_chars: usize,
    excerpt_chars: usize,
    degraded_penalty: f32,
    generate_timeout: Duration,
    /// Extra generation attempts after the first
    retries: u32,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn LlmProvider>, config: &RagConfig) -> Self {
        Self {
            generator,
            scorer: ConfidenceScorer::from_config(&config.synthesis),
            context_chars: config.llm.context_chars,
            excerpt_chars: config.synthesis.excerpt_chars,
            degraded_penalty: config.synthesis.degraded_penalty,
            generate_timeout: config.llm.timeout(),
            retries: config.synthesis.query_retries,
        }
    }

    pub fn generator(&self) -> &Arc<dyn LlmProvider> {
        &self.generator
    }

    /// Answer `question` from `retrieved`, ranked best first
    pub async fn synthesize(&self, question: &str, retrieved: &[ScoredChunk]) -> Answer {
        if retrieved.is_empty() {
            return Answer::not_found();
        }

        let terms = key_terms(question);
        let passages = PromptBuilder::select_passages(retrieved, self.context_chars);
        let prompt = PromptBuilder::build(question, passages);

        match self.generate_with_retry(&prompt).await {
            Ok(text) => {
                let confidence = self.confidence(&prompt.passages, &terms);
                let citations = prompt
                    .passages
                    .iter()
                    .map(|p| citation_for(p, &terms, self.excerpt_chars))
                    .collect();

                Answer {
                    answer: text.trim().to_string(),
                    confidence,
                    citations,
                    degraded: false,
                    processing_time_ms: 0,
                    chunks_retrieved: retrieved.len(),
                    chunks_used: prompt.passages.len(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    generator = self.generator.name(),
                    error = %e,
                    "generation failed, answering from top passage"
                );
                self.extractive_answer(&terms, retrieved.len(), prompt.passages)
            }
        }
    }

    /// Degraded answer without calling the generator
    pub fn fallback(&self, question: &str, retrieved: &[ScoredChunk]) -> Answer {
        if retrieved.is_empty() {
            return Answer::not_found();
        }

        let terms = key_terms(question);
        let passages = PromptBuilder::select_passages(retrieved, self.context_chars);
        self.extractive_answer(&terms, retrieved.len(), passages)
    }

    fn extractive_answer(
        &self,
        terms: &[String],
        chunks_retrieved: usize,
        passages: Vec<PromptPassage>,
    ) -> Answer {
        let Some(top) = passages.into_iter().next() else {
            return Answer::not_found();
        };

        let used = std::slice::from_ref(&top);
        let confidence = self.confidence(used, terms) * self.degraded_penalty;

        Answer {
            answer: top.text.clone(),
            confidence: confidence.clamp(0.0, 1.0),
            citations: vec![citation_for(&top, terms, self.excerpt_chars)],
            degraded: true,
            processing_time_ms: 0,
            chunks_retrieved,
            chunks_used: 1,
        }
    }

    fn confidence(&self, passages: &[PromptPassage], terms: &[String]) -> f32 {
        let similarities: Vec<f32> = passages.iter().map(|p| p.similarity).collect();
        let context = passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.scorer.score(&similarities, coverage(terms, &context))
    }

    async fn generate_with_retry(&self, prompt: &Prompt) -> Result<String> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(
                self.generate_timeout,
                self.generator.generate(prompt),
            )
            .await
            {
                Ok(Ok(text)) if text.trim().is_empty() => {
                    Err(Error::MalformedResponse("generator returned no text".to_string()))
                }
                Ok(result) => result,
                Err(_) => Err(Error::timeout("generation")),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "generation failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
