//! Answer generation with citation handling and confidence scoring

pub mod citation;
pub mod confidence;
pub mod ollama;
pub mod prompt;
pub mod synthesizer;

pub use citation::{citation_for, highlight_snippet, truncate_snippet};
pub use confidence::{key_terms, ConfidenceScorer};
pub use ollama::OllamaClient;
pub use prompt::{Prompt, PromptBuilder, PromptPassage};
pub use synthesizer::AnswerSynthesizer;
