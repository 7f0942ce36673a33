//! In-memory vector index with exact cosine search

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{ChunkMetadata, ScoredChunk};

/// A stored vector and its chunk metadata
#[derive(Debug, Clone)]
struct IndexEntry {
    chunk_id: Uuid,
    vector: Vec<f32>,
    norm: f32,
    metadata: ChunkMetadata,
    /// Staged entries are stored but never returned by searches
    visible: bool,
}

#[derive(Debug, Default)]
struct IndexInner {
    /// Fixed by the first insertion
    dimensions: Option<usize>,
    next_seq: u64,
    /// Entries keyed by insertion sequence, so iteration is insertion order
    entries: BTreeMap<u64, IndexEntry>,
    positions: HashMap<Uuid, u64>,
}

impl IndexInner {
    fn check_dimensions(&self, actual: usize) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != actual => {
                Err(Error::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn upsert(&mut self, chunk_id: Uuid, vector: Vec<f32>, metadata: ChunkMetadata, visible: bool) {
        self.dimensions.get_or_insert(vector.len());

        let seq = match self.positions.get(&chunk_id) {
            Some(seq) => *seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.positions.insert(chunk_id, seq);
                seq
            }
        };

        let norm = l2_norm(&vector);
        self.entries.insert(
            seq,
            IndexEntry {
                chunk_id,
                vector,
                norm,
                metadata,
                visible,
            },
        );
    }

    fn searchable(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values().filter(|entry| entry.visible)
    }
}

/// Exact nearest-neighbour index over chunk embeddings.
///
/// Searches rank by cosine similarity, descending. Equal similarities keep
/// insertion order, so results are reproducible for a given index state.
/// Re-inserting an existing chunk id replaces its vector but keeps its
/// original position for tie-breaking.
///
/// Entries added with [`VectorIndex::stage_batch`] stay out of search results
/// until [`VectorIndex::publish`] makes them visible.
#[derive(Debug, Default)]
pub struct VectorIndex {
    inner: RwLock<IndexInner>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a single entry
    pub fn insert(&self, chunk_id: Uuid, vector: Vec<f32>, metadata: ChunkMetadata) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::invalid_argument("cannot index an empty vector"));
        }

        let mut inner = self.inner.write();
        inner.check_dimensions(vector.len())?;
        inner.upsert(chunk_id, vector, metadata, true);
        Ok(())
    }

    /// Insert a batch under one write lock; nothing is inserted if any vector is rejected
    pub fn insert_batch(&self, batch: Vec<(Uuid, Vec<f32>, ChunkMetadata)>) -> Result<()> {
        self.insert_entries(batch, true)
    }

    /// Like [`insert_batch`](Self::insert_batch), but the entries stay hidden
    /// from searches until published
    pub fn stage_batch(&self, batch: Vec<(Uuid, Vec<f32>, ChunkMetadata)>) -> Result<()> {
        self.insert_entries(batch, false)
    }

    /// Make `staged` searchable and remove `retired`, under one write lock.
    /// Returns how many retired entries were removed.
    pub fn publish(&self, staged: &[Uuid], retired: &[Uuid]) -> usize {
        let mut inner = self.inner.write();
        for id in staged {
            if let Some(seq) = inner.positions.get(id).copied() {
                if let Some(entry) = inner.entries.get_mut(&seq) {
                    entry.visible = true;
                }
            }
        }

        let mut removed = 0;
        for id in retired {
            if let Some(seq) = inner.positions.remove(id) {
                inner.entries.remove(&seq);
                removed += 1;
            }
        }
        removed
    }

    fn insert_entries(
        &self,
        batch: Vec<(Uuid, Vec<f32>, ChunkMetadata)>,
        visible: bool,
    ) -> Result<()> {
        let Some(first) = batch.first() else {
            return Ok(());
        };
        let batch_dims = first.1.len();
        if batch_dims == 0 {
            return Err(Error::invalid_argument("cannot index an empty vector"));
        }
        if let Some((_, vector, _)) = batch.iter().find(|(_, v, _)| v.len() != batch_dims) {
            return Err(Error::DimensionMismatch {
                expected: batch_dims,
                actual: vector.len(),
            });
        }

        let mut inner = self.inner.write();
        inner.check_dimensions(batch_dims)?;
        for (chunk_id, vector, metadata) in batch {
            inner.upsert(chunk_id, vector, metadata, visible);
        }
        Ok(())
    }

    /// The `k` entries most similar to `query`
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let inner = self.inner.read();
        if inner.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        inner.check_dimensions(query.len())?;

        let query_norm = l2_norm(query);
        let mut scored: Vec<(f32, &IndexEntry)> = inner
            .searchable()
            .map(|entry| (cosine(query, query_norm, &entry.vector, entry.norm), entry))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        tracing::debug!(entries = inner.entries.len(), returned = scored.len(), "vector search");

        Ok(scored
            .into_iter()
            .map(|(similarity, entry)| ScoredChunk {
                chunk_id: entry.chunk_id,
                similarity,
                metadata: entry.metadata.clone(),
            })
            .collect())
    }

    /// Rank chunks by the fraction of `terms` their text contains.
    ///
    /// Used when no query vector can be computed. Chunks matching no term are skipped.
    pub fn lexical_search(&self, terms: &[String], k: usize) -> Vec<ScoredChunk> {
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let inner = self.inner.read();
        let mut scored: Vec<(f32, &IndexEntry)> = inner
            .searchable()
            .filter_map(|entry| {
                let content = entry.metadata.content.to_lowercase();
                let matched = terms.iter().filter(|t| content.contains(t.as_str())).count();
                (matched > 0).then(|| (matched as f32 / terms.len() as f32, entry))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(similarity, entry)| ScoredChunk {
                chunk_id: entry.chunk_id,
                similarity,
                metadata: entry.metadata.clone(),
            })
            .collect()
    }

    /// Remove entries; unknown ids are ignored. Returns how many were removed.
    pub fn delete(&self, chunk_ids: &[Uuid]) -> usize {
        let mut inner = self.inner.write();
        let mut removed = 0;
        for id in chunk_ids {
            if let Some(seq) = inner.positions.remove(id) {
                inner.entries.remove(&seq);
                removed += 1;
            }
        }
        removed
    }

    pub fn contains(&self, chunk_id: &Uuid) -> bool {
        self.inner.read().positions.contains_key(chunk_id)
    }

    /// Drop every entry and forget the dimensionality
    pub fn clear(&self) {
        *self.inner.write() = IndexInner::default();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality fixed by the first insertion
    pub fn dimensions(&self) -> Option<usize> {
        self.inner.read().dimensions
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; 0 when either vector has zero length
fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, ContentType};
    use proptest::prelude::*;

    fn meta(document_id: Uuid, index: u32, content: &str) -> ChunkMetadata {
        ChunkMetadata {
            document_id,
            chunk_index: index,
            content: content.to_string(),
            char_start: 0,
            char_end: content.chars().count(),
            source: ChunkSource::new("doc.txt", ContentType::Text),
        }
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new();
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_fixed_by_first_insert() {
        let index = VectorIndex::new();
        let doc = Uuid::new_v4();
        index.insert(Uuid::new_v4(), vec![1.0, 0.0, 0.0], meta(doc, 0, "a")).unwrap();

        let err = index
            .insert(Uuid::new_v4(), vec![1.0, 0.0], meta(doc, 1, "b"))
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimensions(), Some(3));
    }

    #[test]
    fn test_staged_entries_hidden_until_published() {
        let index = VectorIndex::new();
        let old_doc = Uuid::new_v4();
        let old = Uuid::new_v4();
        index.insert(old, vec![0.0, 1.0], meta(old_doc, 0, "old")).unwrap();

        let new_doc = Uuid::new_v4();
        let staged = Uuid::new_v4();
        index
            .stage_batch(vec![(staged, vec![1.0, 0.0], meta(new_doc, 0, "new text"))])
            .unwrap();

        assert_eq!(index.len(), 2);
        let hits = index.search(&[1.0, 0.0], 5).unwrap();
        assert!(hits.iter().all(|h| h.chunk_id != staged));
        assert!(index.lexical_search(&["new".to_string()], 5).is_empty());

        // Swap in one step
        assert_eq!(index.publish(&[staged], &[old]), 1);
        let hits = index.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, staged);
        assert!(!index.contains(&old));
    }

    #[test]
    fn test_staged_entries_can_be_rolled_back() {
        let index = VectorIndex::new();
        let doc = Uuid::new_v4();
        let staged = Uuid::new_v4();
        index
            .stage_batch(vec![(staged, vec![1.0, 0.0], meta(doc, 0, "partial"))])
            .unwrap();

        assert_eq!(index.delete(&[staged]), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let index = VectorIndex::new();
        let doc = Uuid::new_v4();
        index.insert(Uuid::new_v4(), vec![1.0, 0.0], meta(doc, 0, "a")).unwrap();

        let batch = vec![
            (Uuid::new_v4(), vec![0.0, 1.0], meta(doc, 1, "b")),
            (Uuid::new_v4(), vec![0.0, 1.0, 0.5], meta(doc, 2, "c")),
        ];
        assert!(index.insert_batch(batch).is_err());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_ranking_and_tie_break() {
        let index = VectorIndex::new();
        let doc = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let best = Uuid::new_v4();

        index.insert(first, vec![1.0, 1.0], meta(doc, 0, "first")).unwrap();
        index.insert(second, vec![2.0, 2.0], meta(doc, 1, "second")).unwrap();
        index.insert(best, vec![1.0, 0.0], meta(doc, 2, "best")).unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk_id).collect();

        assert_eq!(ids, vec![best, first, second]);
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let index = VectorIndex::new();
        let doc = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        index.insert(a, vec![0.0, 1.0], meta(doc, 0, "a")).unwrap();
        index.insert(b, vec![1.0, 0.0], meta(doc, 1, "b")).unwrap();
        index.insert(a, vec![1.0, 0.0], meta(doc, 0, "a2")).unwrap();

        assert_eq!(index.len(), 2);
        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].chunk_id, a);
        assert_eq!(results[0].metadata.content, "a2");
    }

    #[test]
    fn test_zero_vector_similarity() {
        let index = VectorIndex::new();
        index.insert(Uuid::new_v4(), vec![0.0, 0.0], meta(Uuid::new_v4(), 0, "z")).unwrap();

        let results = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].similarity, 0.0);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let index = VectorIndex::new();
        let doc = Uuid::new_v4();
        let a = Uuid::new_v4();
        index.insert(a, vec![1.0], meta(doc, 0, "a")).unwrap();

        assert_eq!(index.delete(&[a, Uuid::new_v4()]), 1);
        assert_eq!(index.delete(&[a]), 0);
        assert!(index.is_empty());
        assert!(!index.contains(&a));
    }

    #[test]
    fn test_clear_resets_dimensions() {
        let index = VectorIndex::new();
        index.insert(Uuid::new_v4(), vec![1.0, 2.0], meta(Uuid::new_v4(), 0, "a")).unwrap();
        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.dimensions(), None);
        index.insert(Uuid::new_v4(), vec![1.0], meta(Uuid::new_v4(), 0, "b")).unwrap();
    }

    #[test]
    fn test_lexical_search() {
        let index = VectorIndex::new();
        let doc = Uuid::new_v4();
        let meeting = Uuid::new_v4();
        index.insert(Uuid::new_v4(), vec![1.0], meta(doc, 0, "Lunch is served at noon.")).unwrap();
        index
            .insert(meeting, vec![1.0], meta(doc, 1, "The meeting is on Monday at 10am."))
            .unwrap();

        let terms = vec!["meeting".to_string(), "monday".to_string()];
        let results = index.lexical_search(&terms, 5);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, meeting);
        assert_eq!(results[0].similarity, 1.0);
    }

    proptest! {
        #[test]
        fn prop_search_bounded_sorted_idempotent(
            vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 4), 0..40),
            query in prop::collection::vec(-1.0f32..1.0, 4),
            k in 0usize..50,
        ) {
            let index = VectorIndex::new();
            let doc = Uuid::new_v4();
            for (i, vector) in vectors.into_iter().enumerate() {
                index.insert(Uuid::new_v4(), vector, meta(doc, i as u32, "x")).unwrap();
            }

            let first = index.search(&query, k).unwrap();
            let second = index.search(&query, k).unwrap();

            prop_assert!(first.len() <= k);
            prop_assert!(first.len() <= index.len());
            for pair in first.windows(2) {
                prop_assert!(pair[0].similarity >= pair[1].similarity);
            }
            let first_ids: Vec<_> = first.iter().map(|r| r.chunk_id).collect();
            let second_ids: Vec<_> = second.iter().map(|r| r.chunk_id).collect();
            prop_assert_eq!(first_ids, second_ids);
        }
    }
}
