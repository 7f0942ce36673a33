//! session-rag: session-scoped retrieval-augmented answering
//!
//! Documents ingested during a session are chunked, embedded and held in an
//! in-memory vector index. Questions are answered from the most similar
//! chunks, with a confidence score and citations back to the source text.
//! When the generator or the query embedder fails, the pipeline still answers
//! from the retrieved text and marks the answer as degraded.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use types::{
    Answer, Chunk, ChunkSource, Citation, Document, DocumentStatus, IndexStats, IngestRequest,
    QueryRequest, NO_RELEVANT_INFORMATION,
};
