//! Configuration for the answering pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "SESSION_RAG_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Generator (LLM) configuration
    pub llm: LlmConfig,
    /// Retrieval defaults
    pub retrieval: RetrievalConfig,
    /// Answer synthesis tuning
    pub synthesis: SynthesisConfig,
    /// Ingestion retry and batching
    pub ingestion: IngestionConfig,
}

impl RagConfig {
    /// Parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&raw)
    }

    /// Parse TOML text; missing sections fall back to defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        Ok(config)
    }

    /// Load from `SESSION_RAG_CONFIG` if set, then apply env overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                tracing::info!("Loading configuration from {}", path);
                Self::from_file(path)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(host) = std::env::var("SESSION_RAG_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("SESSION_RAG_PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| Error::config(format!("SESSION_RAG_PORT: {e}")))?;
        }

        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be positive"));
        }

        let s = &self.synthesis;
        if s.similarity_weight < 0.0 || s.coverage_weight < 0.0 {
            return Err(Error::config("synthesis weights must be non-negative"));
        }
        if s.similarity_weight <= 0.0 {
            return Err(Error::config("synthesis.similarity_weight must be positive"));
        }
        if !(0.0..=1.0).contains(&s.degraded_penalty) {
            return Err(Error::config("synthesis.degraded_penalty must be within [0, 1]"));
        }

        if self.llm.context_chars == 0 {
            return Err(Error::config("llm.context_chars must be positive"));
        }

        let r = &self.retrieval;
        if r.default_top_k == 0 || r.default_top_k > r.max_top_k {
            return Err(Error::config(format!(
                "retrieval.default_top_k must be within 1..={}",
                r.max_top_k
            )));
        }
        if !r.min_similarity.is_finite() {
            return Err(Error::config("retrieval.min_similarity must be finite"));
        }

        if self.ingestion.max_attempts == 0 {
            return Err(Error::config("ingestion.max_attempts must be at least 1"));
        }
        if self.ingestion.index_batch_size == 0 {
            return Err(Error::config("ingestion.index_batch_size must be positive"));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 25 * 1024 * 1024, // 25MB
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive windows
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Overlap must leave room for the window to advance
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Which embedding backend to build at startup
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// In-process feature hashing
    #[default]
    Hash,
    /// Ollama server
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend selection
    pub provider: EmbeddingBackend,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Deadline for a single embed call
    pub timeout_ms: u64,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Hash,
            dimensions: 384,
            timeout_ms: 10_000,
        }
    }
}

/// Which answer generator to build at startup
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    /// Sentence selection from the retrieved context
    #[default]
    Extractive,
    /// Ollama generate endpoint
    Ollama,
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Generator selection
    pub generator: GeneratorBackend,
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// HTTP-level retries inside the client
    pub max_retries: u32,
    /// Context budget for the prompt, in characters
    pub context_chars: usize,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorBackend::Extractive,
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "phi3".to_string(),
            temperature: 0.3, // Lower for more factual answers
            timeout_secs: 60,
            max_retries: 0,
            context_chars: 6000,
        }
    }
}

/// Retrieval defaults applied when a query leaves them out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Candidates below this cosine similarity are discarded
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 100,
            min_similarity: 0.1,
        }
    }
}

/// Answer synthesis tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Weight of the similarity component of confidence
    pub similarity_weight: f32,
    /// Weight of the key-term coverage component of confidence
    pub coverage_weight: f32,
    /// Multiplier applied to confidence in degraded mode
    pub degraded_penalty: f32,
    /// Citation excerpt length in characters
    pub excerpt_chars: usize,
    /// Extra attempts for query-time collaborator calls
    pub query_retries: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.7,
            coverage_weight: 0.3,
            degraded_penalty: 0.5,
            excerpt_chars: 400,
            query_retries: 1,
        }
    }
}

/// Ingestion retry and batching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Attempts per chunk embedding, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Entries inserted per index write lock
    pub index_batch_size: usize,
    /// Concurrent embedding calls per document
    pub parallel_embeddings: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 200,
            max_backoff_ms: 5000,
            index_batch_size: 64,
            parallel_embeddings: 4,
        }
    }
}
