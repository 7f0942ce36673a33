//! Response types for queries and ingestion

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{ChunkMetadata, DocumentStatus, DocumentSummary};

/// Fixed answer text when retrieval finds nothing
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found in the ingested documents.";

/// A chunk returned by search, with its similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub chunk_id: Uuid,
    /// Cosine similarity, or term overlap for lexical search
    pub similarity: f32,
    pub metadata: ChunkMetadata,
}

/// Relevance indicator for citations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelevanceInfo {
    /// Relevance score (0-100)
    pub score: u32,
    /// Human-readable label
    pub label: String,
}

impl RelevanceInfo {
    /// Create relevance info from similarity score (0.0-1.0)
    pub fn from_similarity(similarity: f32) -> Self {
        let score = (similarity.clamp(0.0, 1.0) * 100.0).round() as u32;
        let label = match score {
            90..=100 => "Excellent",
            75..=89 => "High",
            50..=74 => "Medium",
            25..=49 => "Low",
            _ => "Weak",
        };
        Self {
            score,
            label: label.to_string(),
        }
    }
}

/// Citation from a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Document ID
    pub document_id: Uuid,
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Position of the chunk within its document
    pub chunk_index: u32,
    /// Source filename
    pub filename: String,
    /// Page number (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Snippet from the source, cut at a word boundary
    pub excerpt: String,
    /// Excerpt with highlighted query terms (<mark> tags)
    pub excerpt_highlighted: String,
    /// Similarity score (0.0-1.0)
    pub similarity: f32,
    pub relevance: RelevanceInfo,
}

impl Citation {
    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        match self.page_number {
            Some(page) => format!("[Source: {}, Page {}]", self.filename, page),
            None => format!("[Source: {}]", self.filename),
        }
    }
}

/// Answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text
    pub answer: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Citations in the order their chunks appear in the prompt
    pub citations: Vec<Citation>,
    /// Answer came from the extractive fallback
    pub degraded: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Number of chunks retrieved
    pub chunks_retrieved: usize,
    /// Number of chunks that fit in the context
    pub chunks_used: usize,
}

impl Answer {
    /// Answer when no chunk passed retrieval
    pub fn not_found() -> Self {
        Self {
            answer: NO_RELEVANT_INFORMATION.to_string(),
            confidence: 0.0,
            citations: Vec::new(),
            degraded: false,
            processing_time_ms: 0,
            chunks_retrieved: 0,
            chunks_used: 0,
        }
    }

    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

/// Index and registry counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    /// Documents in the Indexed state
    pub document_count: usize,
    /// Chunks across indexed documents
    pub chunk_count: usize,
    /// Entries in the vector index
    pub index_size: usize,
}

/// Health of one collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub name: String,
    pub healthy: bool,
}

/// Pipeline health and configuration summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub embedder: ProviderHealth,
    pub generator: ProviderHealth,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub stats: IndexStats,
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    #[serde(flatten)]
    pub status: DocumentStatus,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Document listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

impl DocumentListResponse {
    pub fn new(documents: Vec<DocumentSummary>) -> Self {
        Self {
            total: documents.len(),
            documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_labels() {
        assert_eq!(RelevanceInfo::from_similarity(0.95).label, "Excellent");
        assert_eq!(RelevanceInfo::from_similarity(0.8).label, "High");
        assert_eq!(RelevanceInfo::from_similarity(0.5).label, "Medium");
        assert_eq!(RelevanceInfo::from_similarity(0.3).label, "Low");
        assert_eq!(RelevanceInfo::from_similarity(-0.4).label, "Weak");
        assert_eq!(RelevanceInfo::from_similarity(1.7).score, 100);
    }

    #[test]
    fn test_not_found_answer() {
        let answer = Answer::not_found();
        assert_eq!(answer.confidence, 0.0);
        assert!(answer.citations.is_empty());
        assert!(!answer.degraded);
    }
}
