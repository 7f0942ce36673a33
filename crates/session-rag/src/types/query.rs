//! Query and ingest request types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{ContentType, PageMarker};

/// Query request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve; configured default when absent.
    /// Signed so that non-positive values reach validation instead of failing to parse.
    #[serde(default)]
    pub top_k: Option<i64>,

    /// Minimum cosine similarity; configured default when absent
    #[serde(default)]
    pub min_similarity: Option<f32>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: i64) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the similarity threshold
    pub fn with_min_similarity(mut self, threshold: f32) -> Self {
        self.min_similarity = Some(threshold);
        self
    }
}

/// Text ingestion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Caller-chosen id; a new one is assigned when absent
    #[serde(default)]
    pub document_id: Option<Uuid>,
    pub filename: String,
    /// Extracted plain text
    pub text: String,
    /// Detected from the filename when absent
    #[serde(default)]
    pub content_type: Option<ContentType>,
    /// Page boundaries within `text`
    #[serde(default)]
    pub pages: Vec<PageMarker>,
}

impl IngestRequest {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document_id: None,
            filename: filename.into(),
            text: text.into(),
            content_type: None,
            pages: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.document_id = Some(id);
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_pages(mut self, pages: Vec<PageMarker>) -> Self {
        self.pages = pages;
        self
    }

    /// Explicit content type, or the one implied by the filename
    pub fn resolved_content_type(&self) -> ContentType {
        self.content_type
            .unwrap_or_else(|| ContentType::from_filename(&self.filename))
    }
}
