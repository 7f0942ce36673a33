//! Text chunking with page and position tracking

use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSource, PageMarker};

/// Fixed-size character window chunker with overlap
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Characters shared by consecutive windows
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; overlap must be smaller than the window
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be positive"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Lazy windows over `text`; call again (or clone) to restart
    pub fn windows<'a>(&self, text: &'a str) -> ChunkWindows<'a> {
        ChunkWindows {
            text,
            chunk_size: self.chunk_size,
            step: self.step(),
            byte_pos: 0,
            char_pos: 0,
            index: 0,
            done: text.is_empty(),
        }
    }

    /// Chunk a document's text, attaching source and page information
    pub fn chunk_document(
        &self,
        document_id: Uuid,
        text: &str,
        source: &ChunkSource,
        pages: &[PageMarker],
    ) -> Vec<Chunk> {
        let mut pages = pages.to_vec();
        pages.sort_by_key(|p| p.char_offset);

        self.windows(text)
            .map(|window| {
                let mut chunk_source = source.clone();
                chunk_source.page_number = page_at(&pages, window.char_start);

                Chunk {
                    id: Uuid::new_v4(),
                    document_id,
                    chunk_index: window.index,
                    content: window.text.to_string(),
                    char_start: window.char_start,
                    char_end: window.char_end,
                    embedding: Vec::new(),
                    source: chunk_source,
                }
            })
            .collect()
    }
}

/// Page containing the character at `char_offset`
fn page_at(pages: &[PageMarker], char_offset: usize) -> Option<u32> {
    pages
        .iter()
        .take_while(|p| p.char_offset <= char_offset)
        .last()
        .map(|p| p.page_number)
}

/// One window of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextWindow<'a> {
    pub index: u32,
    /// Character range, end exclusive
    pub char_start: usize,
    pub char_end: usize,
    pub text: &'a str,
}

/// Iterator over overlapping windows; the last one is truncated, never padded
#[derive(Debug, Clone)]
pub struct ChunkWindows<'a> {
    text: &'a str,
    chunk_size: usize,
    step: usize,
    byte_pos: usize,
    char_pos: usize,
    index: u32,
    done: bool,
}

impl<'a> ChunkWindows<'a> {
    /// Byte offset `chars` characters after `from`, clamped to the end of text
    fn advance(&self, from: usize, chars: usize) -> usize {
        self.text[from..]
            .char_indices()
            .nth(chars)
            .map(|(i, _)| from + i)
            .unwrap_or(self.text.len())
    }
}

impl<'a> Iterator for ChunkWindows<'a> {
    type Item = TextWindow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let end = self.advance(self.byte_pos, self.chunk_size);
        let text = &self.text[self.byte_pos..end];
        let len = text.chars().count();

        let window = TextWindow {
            index: self.index,
            char_start: self.char_pos,
            char_end: self.char_pos + len,
            text,
        };

        if end == self.text.len() {
            self.done = true;
        } else {
            self.byte_pos = self.advance(self.byte_pos, self.step);
            self.char_pos += self.step;
            self.index += 1;
        }

        Some(window)
    }
}

impl std::iter::FusedIterator for ChunkWindows<'_> {}
