//! Prompt construction for grounded generation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ChunkSource, ScoredChunk};

/// A retrieved chunk as it appears in the prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPassage {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub source: ChunkSource,
    /// Chunk text, cut to fit the context budget when needed
    pub text: String,
    pub similarity: f32,
}

/// What a generator receives: the rendered prompt plus the parts it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub question: String,
    /// Passages in prompt order, highest ranked first
    pub passages: Vec<PromptPassage>,
    /// Rendered prompt text
    pub text: String,
}

impl Prompt {
    /// Concatenated passage text
    pub fn context(&self) -> String {
        self.passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Prompt builder for grounded queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Keep the highest-ranked chunks whose combined text fits in `budget` characters.
    ///
    /// Lower-ranked chunks are dropped first. A top chunk larger than the budget
    /// is cut to it so the context is never empty.
    pub fn select_passages(retrieved: &[ScoredChunk], budget: usize) -> Vec<PromptPassage> {
        let mut passages = Vec::new();
        let mut used = 0usize;

        for chunk in retrieved {
            let len = chunk.metadata.content.chars().count();

            let text = if used + len <= budget {
                chunk.metadata.content.clone()
            } else if passages.is_empty() && budget > 0 {
                chunk.metadata.content.chars().take(budget).collect()
            } else {
                break;
            };

            used += text.chars().count();
            passages.push(PromptPassage {
                chunk_id: chunk.chunk_id,
                document_id: chunk.metadata.document_id,
                chunk_index: chunk.metadata.chunk_index,
                source: chunk.metadata.source.clone(),
                text,
                similarity: chunk.similarity,
            });
        }

        passages
    }

    /// Render the grounded prompt
    pub fn build(question: &str, passages: Vec<PromptPassage>) -> Prompt {
        let text = format!(
            r#"You answer questions using ONLY the numbered passages below.

RULES:
1. Use only information stated in the passages
2. If the passages do not contain the answer, reply: "No relevant information found in the ingested documents."
3. Do not use outside knowledge or guess
4. Cite each fact with its passage source, e.g. [Source: filename, Page X]

PASSAGES:
{context}

QUESTION: {question}

ANSWER:"#,
            context = Self::format_context(&passages),
            question = question.trim(),
        );

        Prompt {
            question: question.to_string(),
            passages,
            text,
        }
    }

    fn format_context(passages: &[PromptPassage]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, p)| format!("[{}] {}\n{}\n", i + 1, p.source.format_citation(), p.text))
            .collect::<Vec<_>>()
            .join("\n---\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, ContentType};

    fn scored(content: &str, similarity: f32) -> ScoredChunk {
        ScoredChunk {
            chunk_id: Uuid::new_v4(),
            similarity,
            metadata: ChunkMetadata {
                document_id: Uuid::nil(),
                chunk_index: 0,
                content: content.to_string(),
                char_start: 0,
                char_end: content.chars().count(),
                source: ChunkSource::new("notes.txt", ContentType::Text),
            },
        }
    }

    #[test]
    fn test_budget_drops_lowest_ranked() {
        let retrieved = vec![scored("aaaa", 0.9), scored("bbbb", 0.8), scored("cccc", 0.7)];
        let passages = PromptBuilder::select_passages(&retrieved, 9);

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].chunk_id, retrieved[0].chunk_id);
        assert_eq!(passages[1].chunk_id, retrieved[1].chunk_id);
    }

    #[test]
    fn test_oversized_top_chunk_is_truncated() {
        let retrieved = vec![scored("abcdefghij", 0.9), scored("xy", 0.5)];
        let passages = PromptBuilder::select_passages(&retrieved, 4);

        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "abcd");
    }

    #[test]
    fn test_prompt_lists_passages_in_order() {
        let retrieved = vec![scored("first passage", 0.9), scored("second passage", 0.4)];
        let passages = PromptBuilder::select_passages(&retrieved, 1000);
        let prompt = PromptBuilder::build("What comes first?", passages);

        let first = prompt.text.find("first passage").unwrap();
        let second = prompt.text.find("second passage").unwrap();
        assert!(first < second);
        assert!(prompt.text.contains("[1] notes.txt"));
        assert!(prompt.text.contains("QUESTION: What comes first?"));
        assert_eq!(prompt.context(), "first passage\n\nsecond passage");
    }
}
