//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use session_rag::config::RagConfig;
use session_rag::error::{Error, Result};
use session_rag::generation::Prompt;
use session_rag::providers::{EmbeddingProvider, ExtractiveGenerator, HashEmbedder, LlmProvider};
use session_rag::Pipeline;

pub const DIMENSIONS: usize = 128;

/// Hash embedder whose behaviour can be switched during a test
pub struct ScriptedEmbedder {
    inner: HashEmbedder,
    calls: AtomicUsize,
    /// Fail every call with `EmbeddingUnavailable`
    unavailable: AtomicBool,
    /// Sleep this long before answering (0 = no delay)
    delay_ms: AtomicUsize,
    /// Succeed this many times, then fail
    fail_after: Option<usize>,
    /// Texts containing this marker get a vector of the wrong length
    wrong_dimension_marker: Option<&'static str>,
}

impl ScriptedEmbedder {
    pub fn new() -> Self {
        Self {
            inner: HashEmbedder::new(DIMENSIONS).unwrap(),
            calls: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            delay_ms: AtomicUsize::new(0),
            fail_after: None,
            wrong_dimension_marker: None,
        }
    }

    pub fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Self::new()
        }
    }

    pub fn wrong_dimension_for(marker: &'static str) -> Self {
        Self {
            wrong_dimension_marker: Some(marker),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::embedding("scripted outage"));
        }
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(Error::embedding("scripted failure"));
        }
        if self.wrong_dimension_marker.is_some_and(|m| text.contains(m)) {
            return Ok(vec![0.5; DIMENSIONS / 2]);
        }
        Ok(self.inner.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Generator that is always rate limited
pub struct RateLimitedLlm;

#[async_trait]
impl LlmProvider for RateLimitedLlm {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        Err(Error::RateLimited("quota exhausted".to_string()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "rate-limited"
    }

    fn model(&self) -> &str {
        "none"
    }
}

pub fn config(chunk_size: usize, overlap: usize) -> RagConfig {
    let mut config = RagConfig::default();
    config.chunking.chunk_size = chunk_size;
    config.chunking.chunk_overlap = overlap;
    config.embeddings.dimensions = DIMENSIONS;
    config.embeddings.timeout_ms = 500;
    config.ingestion.max_attempts = 1;
    config.ingestion.index_batch_size = 1;
    config
}

pub fn pipeline_with(config: RagConfig, embedder: Arc<ScriptedEmbedder>) -> Pipeline {
    Pipeline::new(config, embedder, Arc::new(ExtractiveGenerator::new())).unwrap()
}

pub fn pipeline(chunk_size: usize, overlap: usize) -> (Pipeline, Arc<ScriptedEmbedder>) {
    let embedder = Arc::new(ScriptedEmbedder::new());
    let pipeline = pipeline_with(config(chunk_size, overlap), Arc::clone(&embedder));
    (pipeline, embedder)
}
