//! Collaborator abstractions for embeddings, generation and text extraction
//!
//! The pipeline only sees the traits; the concrete backend is chosen from
//! configuration at startup.

pub mod embedding;
pub mod extraction;
pub mod extractive;
pub mod hash;
pub mod llm;
pub mod ollama;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, GeneratorBackend, RagConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use extraction::{PlainTextExtractor, TextExtractor};
pub use extractive::ExtractiveGenerator;
pub use hash::HashEmbedder;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm};

/// Build the configured embedding provider
pub fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embeddings.dimensions)?),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.llm,
            config.embeddings.dimensions,
        )?),
    };
    tracing::info!("Embedding provider: {}", embedder.name());
    Ok(embedder)
}

/// Build the configured answer generator
pub fn build_generator(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    let generator: Arc<dyn LlmProvider> = match config.llm.generator {
        GeneratorBackend::Extractive => Arc::new(ExtractiveGenerator::new()),
        GeneratorBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
    };
    tracing::info!("Answer generator: {} ({})", generator.name(), generator.model());
    Ok(generator)
}
