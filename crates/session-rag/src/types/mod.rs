//! Core types for the answering pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{
    content_hash, Chunk, ChunkMetadata, ChunkSource, ContentType, Document, DocumentState,
    DocumentStatus, DocumentSummary, PageMarker,
};
pub use query::{IngestRequest, QueryRequest};
pub use response::{
    Answer, Citation, DocumentListResponse, HealthReport, IndexStats, IngestResponse,
    ProviderHealth, RelevanceInfo, ScoredChunk, NO_RELEVANT_INFORMATION,
};
