//! Query-time retrieval: embed the question, search, apply the threshold

use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::key_terms;
use crate::providers::EmbeddingProvider;
use crate::types::ScoredChunk;

use super::index::VectorIndex;

/// Retrieves the chunks most relevant to a question
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    embed_timeout: Duration,
    /// Extra embedding attempts after the first
    retries: u32,
    max_top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            embed_timeout: config.embeddings.timeout(),
            retries: config.synthesis.query_retries,
            max_top_k: config.retrieval.max_top_k,
        }
    }

    /// Check `top_k` and `min_similarity`, returning `top_k` as a count
    pub fn validate(&self, top_k: i64, min_similarity: f32) -> Result<usize> {
        if top_k <= 0 {
            return Err(Error::invalid_argument(format!(
                "top_k must be a positive integer, got {top_k}"
            )));
        }
        let top_k = usize::try_from(top_k).unwrap_or(usize::MAX);
        if top_k > self.max_top_k {
            return Err(Error::invalid_argument(format!(
                "top_k must be at most {}, got {top_k}",
                self.max_top_k
            )));
        }
        if !min_similarity.is_finite() {
            return Err(Error::invalid_argument("min_similarity must be a finite number"));
        }
        Ok(top_k)
    }

    /// Embed `question` and return up to `top_k` chunks with similarity at
    /// least `min_similarity`, best first. An empty result means no context
    /// was relevant enough.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: i64,
        min_similarity: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let top_k = self.validate(top_k, min_similarity)?;
        if question.trim().is_empty() {
            return Err(Error::invalid_argument("question must not be empty"));
        }

        let vector = self.embed_query(question).await?;
        self.search(&vector, top_k, min_similarity)
    }

    /// Search with an already computed query vector
    pub fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let mut results = self.index.search(vector, top_k)?;
        let candidates = results.len();
        results.retain(|r| r.similarity >= min_similarity);

        tracing::debug!(
            candidates,
            kept = results.len(),
            min_similarity,
            "retrieved chunks"
        );
        Ok(results)
    }

    /// Term-overlap ranking for when the question cannot be embedded
    pub fn lexical(&self, question: &str, top_k: usize) -> Vec<ScoredChunk> {
        self.index.lexical_search(&key_terms(question), top_k)
    }

    /// Embed the question under a deadline, with one retry by default
    pub async fn embed_query(&self, question: &str) -> Result<Vec<f32>> {
        let mut attempt = 0;
        loop {
            let result = tokio::time::timeout(self.embed_timeout, self.embedder.embed(question))
                .await
                .unwrap_or_else(|_| Err(Error::timeout("query embedding")));

            match result {
                Ok(vector) => return Ok(vector),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(
                        embedder = self.embedder.name(),
                        attempt,
                        error = %e,
                        "query embedding failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashEmbedder;
    use crate::types::{ChunkMetadata, ChunkSource, ContentType};
    use uuid::Uuid;

    fn setup(texts: &[&str]) -> (Retriever, Vec<Uuid>) {
        let config = RagConfig::default();
        let embedder = Arc::new(HashEmbedder::new(config.embeddings.dimensions).unwrap());
        let index = Arc::new(VectorIndex::new());
        let document_id = Uuid::new_v4();

        let ids = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let id = Uuid::new_v4();
                let metadata = ChunkMetadata {
                    document_id,
                    chunk_index: i as u32,
                    content: text.to_string(),
                    char_start: 0,
                    char_end: text.chars().count(),
                    source: ChunkSource::new("doc.txt", ContentType::Text),
                };
                index.insert(id, embedder.embed_text(text), metadata).unwrap();
                id
            })
            .collect();

        (Retriever::new(embedder, index, &config), ids)
    }

    #[tokio::test]
    async fn test_non_positive_top_k_rejected() {
        let (retriever, _) = setup(&["anything"]);

        for top_k in [0, -1] {
            let err = retriever.retrieve("question", top_k, 0.1).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        assert!(retriever.retrieve("question", 101, 0.1).await.is_err());
    }

    #[tokio::test]
    async fn test_threshold_filters_everything() {
        let (retriever, _) = setup(&["The meeting is on Monday."]);
        let results = retriever.retrieve("meeting", 5, 1.5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_exact_text_ranks_first() {
        let texts = [
            "Quarterly revenue grew strongly overall.",
            "The meeting is on Monday at 10am in Room 4.",
            "Lunch is served at noon in the cafeteria.",
        ];
        let (retriever, ids) = setup(&texts);

        let results = retriever.retrieve(texts[1], 3, 0.1).await.unwrap();

        assert_eq!(results[0].chunk_id, ids[1]);
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let (retriever, _) = setup(&[]);
        assert!(retriever.retrieve("When is the meeting?", 5, 0.1).await.unwrap().is_empty());
    }

    #[test]
    fn test_lexical_fallback() {
        let (retriever, ids) = setup(&["Budget review.", "The meeting is on Monday."]);
        let results = retriever.lexical("When is the meeting?", 5);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, ids[1]);
    }
}
