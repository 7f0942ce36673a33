//! Pipeline orchestration: ingestion, querying and document lifecycle

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, IngestStage, Result};
use crate::generation::AnswerSynthesizer;
use crate::ingestion::TextChunker;
use crate::providers::{build_embedder, build_generator, EmbeddingProvider, LlmProvider};
use crate::retrieval::{Retriever, VectorIndex};
use crate::types::{
    Answer, Chunk, ChunkSource, Document, DocumentState, DocumentStatus, DocumentSummary,
    HealthReport, IndexStats, IngestRequest, ProviderHealth, QueryRequest,
};

use super::registry::DocumentRegistry;
use super::retry::RetryPolicy;

/// Removes a document's staged entries unless committed.
///
/// Runs on early return and when the ingesting future is dropped, so a
/// document is either fully indexed or absent from the index.
struct RollbackGuard<'a> {
    index: &'a VectorIndex,
    registry: &'a DocumentRegistry,
    document_id: Uuid,
    inserted: Vec<Uuid>,
    committed: bool,
}

impl<'a> RollbackGuard<'a> {
    fn new(index: &'a VectorIndex, registry: &'a DocumentRegistry, document_id: Uuid) -> Self {
        Self {
            index,
            registry,
            document_id,
            inserted: Vec::new(),
            committed: false,
        }
    }

    fn record(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.inserted.extend(ids);
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let removed = self.index.delete(&self.inserted);
        self.registry.abandon(&self.document_id);
        tracing::warn!(
            document_id = %self.document_id,
            removed,
            "ingestion rolled back"
        );
    }
}

/// The answering pipeline.
///
/// Owns the vector index and the session's document registry; both live as
/// long as the pipeline. Write path: chunk, embed, index. Read path: embed
/// the question, retrieve, synthesize.
pub struct Pipeline {
    config: RagConfig,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    registry: DocumentRegistry,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    retry: RetryPolicy,
}

impl Pipeline {
    /// Build a pipeline around the given collaborators; invalid configuration is fatal
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = TextChunker::from_config(&config.chunking)?;
        let index = Arc::new(VectorIndex::new());
        let retriever = Retriever::new(Arc::clone(&embedder), Arc::clone(&index), &config);
        let synthesizer = AnswerSynthesizer::new(generator, &config);
        let retry = RetryPolicy::from_config(&config.ingestion);

        tracing::info!(
            embedder = embedder.name(),
            generator = synthesizer.generator().name(),
            chunk_size = config.chunking.chunk_size,
            chunk_overlap = config.chunking.chunk_overlap,
            "pipeline ready"
        );

        Ok(Self {
            config,
            chunker,
            embedder,
            index,
            registry: DocumentRegistry::new(),
            retriever,
            synthesizer,
            retry,
        })
    }

    /// Build a pipeline with the collaborators named in the configuration
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let embedder = build_embedder(&config)?;
        let generator = build_generator(&config)?;
        Self::new(config, embedder, generator)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Ingest extracted text. The document ends `Indexed` with every chunk
    /// searchable, or `Failed` with nothing of this attempt left in the index.
    ///
    /// Re-ingesting identical text under the same id is a no-op; different
    /// text replaces the previous version once the new one is fully indexed.
    pub async fn ingest(&self, request: IngestRequest) -> DocumentStatus {
        let document_id = request.document_id.unwrap_or_else(Uuid::new_v4);
        let started = Instant::now();

        match self.try_ingest(document_id, &request).await {
            Ok(chunk_count) => {
                tracing::info!(
                    document_id = %document_id,
                    chunk_count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "document indexed"
                );
                DocumentStatus::Indexed {
                    document_id,
                    chunk_count,
                }
            }
            Err(e) => {
                tracing::warn!(document_id = %document_id, error = %e, "ingestion failed");
                DocumentStatus::Failed {
                    document_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_ingest(&self, document_id: Uuid, request: &IngestRequest) -> Result<usize> {
        let _lock = self.registry.lock(document_id).await;

        let content_type = request.resolved_content_type();
        let mut document =
            Document::new(document_id, &request.filename, content_type, &request.text);

        let previous = self.registry.get(&document_id);
        if let Some(previous) = &previous {
            if previous.state == DocumentState::Indexed
                && previous.document.content_hash == document.content_hash
            {
                tracing::debug!(document_id = %document_id, "content unchanged, skipping");
                return Ok(previous.document.total_chunks());
            }
        }

        tracing::info!(
            document_id = %document_id,
            filename = %request.filename,
            chars = request.text.chars().count(),
            "ingesting document"
        );

        if request.text.trim().is_empty() {
            return Err(Error::extraction(&request.filename, "no text content")
                .during_ingest(document_id, IngestStage::Chunking, None));
        }

        let source = ChunkSource::new(&request.filename, content_type);
        let mut chunks =
            self.chunker
                .chunk_document(document_id, &request.text, &source, &request.pages);

        let mut guard = RollbackGuard::new(&self.index, &self.registry, document_id);
        if previous.is_none() {
            self.registry.begin(document.clone());
        }

        // No index lock is held while the embedder runs
        let embeddings: Vec<Vec<f32>> = stream::iter(0..chunks.len())
            .map(|i| self.embed_chunk(&chunks[i]))
            .buffered(self.config.ingestion.parallel_embeddings.max(1))
            .try_collect()
            .await?;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        for batch in chunks.chunks_mut(self.config.ingestion.index_batch_size) {
            let first_index = batch.first().map(|c| c.chunk_index);
            let entries: Vec<_> = batch
                .iter_mut()
                .map(|c| (c.id, std::mem::take(&mut c.embedding), c.metadata()))
                .collect();

            self.index
                .stage_batch(entries)
                .map_err(|e| e.during_ingest(document_id, IngestStage::Indexing, first_index))?;
            guard.record(batch.iter().map(|c| c.id));

            tokio::task::yield_now().await;
        }

        // New chunks become searchable in the same write that retires the old ones
        let retired = previous
            .map(|p| p.document.chunk_ids())
            .unwrap_or_default();
        self.index.publish(&guard.inserted, &retired);

        let chunk_count = chunks.len();
        document.chunks = chunks;
        self.registry.commit(document);
        guard.commit();

        Ok(chunk_count)
    }

    async fn embed_chunk(&self, chunk: &Chunk) -> Result<Vec<f32>> {
        let embedder = &self.embedder;
        let text = chunk.content.as_str();
        let deadline = self.config.embeddings.timeout();

        self.retry
            .run("chunk embedding", move || async move {
                tokio::time::timeout(deadline, embedder.embed(text))
                    .await
                    .unwrap_or_else(|_| Err(Error::timeout("embedding")))
            })
            .await
            .map_err(|e| {
                e.during_ingest(chunk.document_id, IngestStage::Embedding, Some(chunk.chunk_index))
            })
    }

    /// Answer a question with the configured defaults for `top_k` and `min_similarity`
    pub async fn query(
        &self,
        question: &str,
        top_k: Option<i64>,
        min_similarity: Option<f32>,
    ) -> Result<Answer> {
        let started = Instant::now();
        let top_k = top_k.unwrap_or(self.config.retrieval.default_top_k as i64);
        let min_similarity = min_similarity.unwrap_or(self.config.retrieval.min_similarity);
        let k = self.retriever.validate(top_k, min_similarity)?;

        if question.trim().is_empty() {
            return Err(Error::invalid_argument("question must not be empty"));
        }

        let answer = match self.retriever.retrieve(question, top_k, min_similarity).await {
            Ok(chunks) => self.synthesizer.synthesize(question, &chunks).await,
            Err(e @ Error::InvalidArgument(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, using lexical retrieval");
                let chunks = self.retriever.lexical(question, k);
                let mut answer = self.synthesizer.fallback(question, &chunks);
                answer.degraded = true;
                answer
            }
        };

        let answer = answer.with_processing_time(elapsed_ms(started.elapsed()));
        tracing::info!(
            chunks_retrieved = answer.chunks_retrieved,
            chunks_used = answer.chunks_used,
            confidence = answer.confidence,
            degraded = answer.degraded,
            elapsed_ms = answer.processing_time_ms,
            "query answered"
        );
        Ok(answer)
    }

    pub async fn query_request(&self, request: &QueryRequest) -> Result<Answer> {
        self.query(&request.question, request.top_k, request.min_similarity)
            .await
    }

    /// Remove a document and all its index entries; false if it was not present
    pub async fn delete(&self, document_id: Uuid) -> bool {
        let _lock = self.registry.lock(document_id).await;

        match self.registry.remove(&document_id) {
            Some(record) => {
                let removed = self.index.delete(&record.document.chunk_ids());
                tracing::info!(document_id = %document_id, removed, "document deleted");
                true
            }
            None => false,
        }
    }

    /// Delete every document; returns how many were removed
    pub async fn clear(&self) -> usize {
        let mut removed = 0;
        for id in self.registry.ids() {
            if self.delete(id).await {
                removed += 1;
            }
        }
        tracing::info!(removed, "cleared all documents");
        removed
    }

    pub fn stats(&self) -> IndexStats {
        let (document_count, chunk_count) = self.registry.indexed_counts();
        IndexStats {
            document_count,
            chunk_count,
            index_size: self.index.len(),
        }
    }

    pub fn documents(&self) -> Vec<DocumentSummary> {
        self.registry.summaries()
    }

    pub fn document(&self, document_id: Uuid) -> Option<DocumentSummary> {
        self.registry.get(&document_id).map(|r| r.summary())
    }

    /// Collaborator health plus current counters
    pub async fn health(&self) -> HealthReport {
        let generator = self.synthesizer.generator();
        let embedder_ok = self.embedder.health_check().await.unwrap_or(false);
        let generator_ok = generator.health_check().await.unwrap_or(false);

        HealthReport {
            status: if embedder_ok && generator_ok {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            embedder: ProviderHealth {
                name: self.embedder.name().to_string(),
                healthy: embedder_ok,
            },
            generator: ProviderHealth {
                name: format!("{} ({})", generator.name(), generator.model()),
                healthy: generator_ok,
            },
            dimensions: self.embedder.dimensions(),
            chunk_size: self.chunker.chunk_size(),
            chunk_overlap: self.chunker.overlap(),
            stats: self.stats(),
        }
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
