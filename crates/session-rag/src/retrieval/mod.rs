//! Vector index and retrieval

pub mod index;
pub mod retriever;

pub use index::VectorIndex;
pub use retriever::Retriever;
