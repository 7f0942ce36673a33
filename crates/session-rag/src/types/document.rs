//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Content type tag supplied with extracted text
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Plain text file
    #[default]
    Text,
    /// Markdown file
    Markdown,
    /// CSV file
    Csv,
    /// JSON document
    Json,
    /// HTML document
    Html,
    /// PDF document (extracted elsewhere)
    Pdf,
    /// Microsoft Word document (extracted elsewhere)
    Docx,
    /// Image, text comes from OCR
    Image,
    /// Unknown file type
    Unknown,
}

impl ContentType {
    /// Detect content type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" | "log" => Self::Text,
            "md" | "markdown" => Self::Markdown,
            "csv" => Self::Csv,
            "json" => Self::Json,
            "html" | "htm" => Self::Html,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "tiff" | "tif" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Detect content type from a filename's extension
    pub fn from_filename(filename: &str) -> Self {
        std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Formats whose bytes are already UTF-8 text
    pub fn is_plain_text(&self) -> bool {
        matches!(
            self,
            Self::Text | Self::Markdown | Self::Csv | Self::Json | Self::Html
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Text => "Text File",
            Self::Markdown => "Markdown",
            Self::Csv => "CSV",
            Self::Json => "JSON",
            Self::Html => "HTML",
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Image => "Image",
            Self::Unknown => "Unknown",
        }
    }
}

/// Page boundary inside extracted text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMarker {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Character offset where the page starts
    pub char_offset: usize,
}

/// Lifecycle of a document within a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Chunks are being embedded and inserted
    Ingesting,
    /// Every chunk is searchable
    Indexed,
}

/// A document that has been accepted for ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded by user
    pub filename: String,
    /// Content type of the source
    pub content_type: ContentType,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
    /// Ordered chunks
    pub chunks: Vec<Chunk>,
}

impl Document {
    /// Create an empty document for the given text
    pub fn new(id: Uuid, filename: impl Into<String>, content_type: ContentType, text: &str) -> Self {
        Self {
            id,
            filename: filename.into(),
            content_type,
            content_hash: content_hash(text),
            ingested_at: chrono::Utc::now(),
            chunks: Vec::new(),
        }
    }

    pub fn chunk_ids(&self) -> Vec<Uuid> {
        self.chunks.iter().map(|c| c.id).collect()
    }

    pub fn total_chunks(&self) -> usize {
        self.chunks.len()
    }
}

/// Hex SHA-256 of a text, used to detect re-ingestion of identical content
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Original filename as uploaded
    pub filename: String,
    pub content_type: ContentType,
    /// Page containing the first character of the chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl ChunkSource {
    pub fn new(filename: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            page_number: None,
        }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        match self.page_number {
            Some(page) => format!("{}, Page {}", self.filename, page),
            None => self.filename.clone(),
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Position of the chunk within its document
    pub chunk_index: u32,
    /// Text content
    pub content: String,
    /// Character range in the source text, end exclusive
    pub char_start: usize,
    pub char_end: usize,
    /// Embedding vector, empty until embedded
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
}

impl Chunk {
    /// Denormalized metadata stored next to the vector
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            document_id: self.document_id,
            chunk_index: self.chunk_index,
            content: self.content.clone(),
            char_start: self.char_start,
            char_end: self.char_end,
            source: self.source.clone(),
        }
    }
}

/// What the index keeps about a chunk so search results need no document lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub content: String,
    pub char_start: usize,
    pub char_end: usize,
    pub source: ChunkSource,
}

/// Outcome of an ingestion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Every chunk is indexed
    Indexed { document_id: Uuid, chunk_count: usize },
    /// Nothing of this attempt remains in the index
    Failed { document_id: Uuid, reason: String },
}

impl DocumentStatus {
    pub fn document_id(&self) -> Uuid {
        match self {
            Self::Indexed { document_id, .. } | Self::Failed { document_id, .. } => *document_id,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub content_type: ContentType,
    pub total_chunks: usize,
    pub content_hash: String,
    pub ingested_at: chrono::DateTime<chrono::Utc>,
    pub state: DocumentState,
}

impl DocumentSummary {
    pub fn from_document(document: &Document, state: DocumentState) -> Self {
        Self {
            id: document.id,
            filename: document.filename.clone(),
            content_type: document.content_type,
            total_chunks: document.total_chunks(),
            content_hash: document.content_hash.clone(),
            ingested_at: document.ingested_at,
            state,
        }
    }
}
