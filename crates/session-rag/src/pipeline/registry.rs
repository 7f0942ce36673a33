//! Session document registry and per-document write locks

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::types::{Document, DocumentState, DocumentSummary};

/// Held while a document's index entries are being changed.
///
/// Dropping it releases the lock and forgets the lock entry once no other
/// task holds or waits on it.
pub struct DocumentLock<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    document_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DocumentLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.document_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// A document and where it is in its lifecycle
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub document: Document,
    pub state: DocumentState,
}

impl DocumentRecord {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary::from_document(&self.document, self.state)
    }
}

/// In-memory arena of the session's documents, keyed by id.
///
/// Index mutations for one document (ingest, replace, delete) run while
/// holding that document's lock, so they never interleave.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: DashMap<Uuid, DocumentRecord>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to one document's index entries
    pub async fn lock(&self, id: Uuid) -> DocumentLock<'_> {
        let lock = self.locks.entry(id).or_default().value().clone();
        let mut held = DocumentLock {
            locks: &self.locks,
            document_id: id,
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Number of documents with a live lock entry
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub fn get(&self, id: &Uuid) -> Option<DocumentRecord> {
        self.documents.get(id).map(|r| r.value().clone())
    }

    /// Record a new document as ingesting; existing records are left alone
    pub fn begin(&self, document: Document) -> bool {
        match self.documents.entry(document.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(DocumentRecord {
                    document,
                    state: DocumentState::Ingesting,
                });
                true
            }
        }
    }

    /// Store the finished document, replacing any previous version
    pub fn commit(&self, document: Document) -> Option<DocumentRecord> {
        self.documents.insert(
            document.id,
            DocumentRecord {
                document,
                state: DocumentState::Indexed,
            },
        )
    }

    /// Drop a record that never reached `Indexed`
    pub fn abandon(&self, id: &Uuid) {
        self.documents
            .remove_if(id, |_, record| record.state == DocumentState::Ingesting);
    }

    pub fn remove(&self, id: &Uuid) -> Option<DocumentRecord> {
        self.documents.remove(id).map(|(_, record)| record)
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.documents.iter().map(|r| *r.key()).collect()
    }

    /// Summaries ordered by ingestion time
    pub fn summaries(&self) -> Vec<DocumentSummary> {
        let mut summaries: Vec<_> = self.documents.iter().map(|r| r.summary()).collect();
        summaries.sort_by(|a, b| a.ingested_at.cmp(&b.ingested_at).then(a.id.cmp(&b.id)));
        summaries
    }

    /// (document count, chunk count) over indexed documents
    pub fn indexed_counts(&self) -> (usize, usize) {
        self.documents
            .iter()
            .filter(|r| r.state == DocumentState::Indexed)
            .fold((0, 0), |(docs, chunks), r| {
                (docs + 1, chunks + r.document.total_chunks())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentType;
    use std::time::Duration;

    fn document(text: &str) -> Document {
        Document::new(Uuid::new_v4(), "doc.txt", ContentType::Text, text)
    }

    #[test]
    fn test_lifecycle() {
        let registry = DocumentRegistry::new();
        let doc = document("hello");
        let id = doc.id;

        assert!(registry.begin(doc.clone()));
        assert!(!registry.begin(doc.clone()));
        assert_eq!(registry.get(&id).unwrap().state, DocumentState::Ingesting);
        assert_eq!(registry.indexed_counts(), (0, 0));

        registry.commit(doc);
        assert_eq!(registry.get(&id).unwrap().state, DocumentState::Indexed);
        assert_eq!(registry.indexed_counts(), (1, 0));

        registry.abandon(&id);
        assert!(registry.get(&id).is_some());

        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
    }

    #[test]
    fn test_abandon_removes_ingesting() {
        let registry = DocumentRegistry::new();
        let doc = document("partial");
        let id = doc.id;

        registry.begin(doc);
        registry.abandon(&id);
        assert!(registry.get(&id).is_none());
    }

    #[tokio::test]
    async fn test_lock_is_per_document() {
        let registry = Arc::new(DocumentRegistry::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _held = registry.lock(a).await;

        // Another document is not blocked
        let other = tokio::time::timeout(Duration::from_millis(100), registry.lock(b)).await;
        assert!(other.is_ok());

        // The same document is
        let same = tokio::time::timeout(Duration::from_millis(100), registry.lock(a)).await;
        assert!(same.is_err());
    }

    #[tokio::test]
    async fn test_lock_entries_are_released() {
        let registry = DocumentRegistry::new();

        for _ in 0..1000 {
            let doc = document("short lived");
            let id = doc.id;
            let _lock = registry.lock(id).await;
            registry.begin(doc);
            registry.abandon(&id);
        }
        assert_eq!(registry.lock_count(), 0);

        let id = Uuid::new_v4();
        let held = registry.lock(id).await;
        assert_eq!(registry.lock_count(), 1);
        drop(held);
        assert_eq!(registry.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_lock_entry() {
        let registry = Arc::new(DocumentRegistry::new());
        let id = Uuid::new_v4();
        let held = registry.lock(id).await;

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _lock = registry.lock(id).await;
            })
        };
        // Let the waiter queue on the existing mutex
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(held);
        waiter.await.unwrap();
        assert_eq!(registry.lock_count(), 0);
    }
}
