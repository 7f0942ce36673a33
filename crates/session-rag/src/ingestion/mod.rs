//! Document ingestion: splitting extracted text into chunks

pub mod chunker;

pub use chunker::{ChunkWindows, TextChunker, TextWindow};
pub use crate::types::PageMarker;
