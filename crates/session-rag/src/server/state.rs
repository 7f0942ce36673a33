//! Application state for the HTTP server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::providers::{PlainTextExtractor, TextExtractor};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Answering pipeline (owns the index and document registry)
    pipeline: Arc<Pipeline>,
    /// Turns uploaded files into text
    extractor: Arc<dyn TextExtractor>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Build the pipeline named by the configuration
    pub fn new(config: RagConfig) -> Result<Self> {
        let pipeline = Pipeline::from_config(config)?;
        Ok(Self::with_pipeline(
            Arc::new(pipeline),
            Arc::new(PlainTextExtractor::new()),
        ))
    }

    /// Wrap an existing pipeline
    pub fn with_pipeline(pipeline: Arc<Pipeline>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                extractor,
                ready: RwLock::new(true),
            }),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn extractor(&self) -> &dyn TextExtractor {
        self.inner.extractor.as_ref()
    }

    pub fn config(&self) -> &RagConfig {
        self.inner.pipeline.config()
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
