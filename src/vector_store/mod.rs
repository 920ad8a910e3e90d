mod memory;
mod qdrant;
pub mod similarity;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

use anyhow::Result;
use async_trait::async_trait;

// Sanitized document names never contain '.', so staging names cannot clash with them.
const STAGING_SUFFIX: &str = ".staging";

/// One embedded chunk of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

impl ChunkRecord {
    pub fn chunk_id(index: usize) -> String {
        format!("chunk_{index}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f32,
}

pub fn staging_name(collection: &str) -> String {
    format!("{collection}{STAGING_SUFFIX}")
}

/// Named collections of chunk records searchable by vector similarity.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn exists(&self, collection: &str) -> Result<bool>;

    /// Creates an empty collection; no-op if it already exists.
    async fn create(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Drops a collection; no-op if it does not exist.
    async fn delete(&self, collection: &str) -> Result<()>;

    /// Writes records into an existing collection, overwriting records with the same id.
    async fn put(&self, collection: &str, records: Vec<ChunkRecord>) -> Result<()>;

    /// Returns up to `limit` records ordered by descending similarity to `vector`.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Atomically makes the content of `staging` visible as `collection`,
    /// dropping whatever `collection` held before. `staging` no longer exists
    /// afterwards.
    async fn promote(&self, staging: &str, collection: &str) -> Result<()>;

    /// Makes `records` the whole content of `collection`.
    ///
    /// Records are written to a staging collection first; `collection` is only
    /// touched once every write succeeded, so a failure leaves it as it was.
    async fn replace(
        &self,
        collection: &str,
        dimension: usize,
        records: Vec<ChunkRecord>,
    ) -> Result<()> {
        let staging = staging_name(collection);
        self.delete(&staging).await?;
        self.create(&staging, dimension).await?;

        if !records.is_empty() {
            if let Err(e) = self.put(&staging, records).await {
                if let Err(cleanup) = self.delete(&staging).await {
                    tracing::warn!(
                        "failed to drop staging collection '{}': {}",
                        staging,
                        cleanup
                    );
                }
                return Err(e);
            }
        }

        self.promote(&staging, collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Delegates to a `MemoryStore` but can be told to reject writes.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        reject_puts: AtomicBool,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn exists(&self, collection: &str) -> Result<bool> {
            self.inner.exists(collection).await
        }

        async fn create(&self, collection: &str, dimension: usize) -> Result<()> {
            self.inner.create(collection, dimension).await
        }

        async fn delete(&self, collection: &str) -> Result<()> {
            self.inner.delete(collection).await
        }

        async fn put(&self, collection: &str, records: Vec<ChunkRecord>) -> Result<()> {
            if self.reject_puts.load(Ordering::SeqCst) {
                bail!("store unavailable");
            }
            self.inner.put(collection, records).await
        }

        async fn query(
            &self,
            collection: &str,
            vector: &[f32],
            limit: usize,
        ) -> Result<Vec<ScoredChunk>> {
            self.inner.query(collection, vector, limit).await
        }

        async fn promote(&self, staging: &str, collection: &str) -> Result<()> {
            self.inner.promote(staging, collection).await
        }
    }

    fn record(index: usize, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: ChunkRecord::chunk_id(index),
            text: text.to_string(),
            vector: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_content() {
        let store = FlakyStore::default();
        store
            .replace("doc", 2, vec![record(0, "original content")])
            .await
            .unwrap();

        store.reject_puts.store(true, Ordering::SeqCst);
        let err = store
            .replace("doc", 2, vec![record(0, "new content")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "store unavailable");

        let hits = store.query("doc", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "original content");
        assert!(!store.exists(&staging_name("doc")).await.unwrap());
    }

    #[tokio::test]
    async fn failed_first_ingest_leaves_nothing_behind() {
        let store = FlakyStore::default();
        store.reject_puts.store(true, Ordering::SeqCst);
        let records = vec![record(0, "x")];
        assert!(store.replace("doc", 2, records).await.is_err());
        assert!(!store.exists("doc").await.unwrap());
        assert!(!store.exists(&staging_name("doc")).await.unwrap());
    }

    #[tokio::test]
    async fn replace_swaps_in_new_content() {
        let store = FlakyStore::default();
        store
            .replace("doc", 2, vec![record(0, "a"), record(1, "b")])
            .await
            .unwrap();
        store.replace("doc", 2, vec![record(0, "c")]).await.unwrap();

        let hits = store.query("doc", &[1.0, 0.0], 5).await.unwrap();
        let texts: Vec<_> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["c"]);
        assert!(!store.exists(&staging_name("doc")).await.unwrap());
    }

    #[test]
    fn staging_names_never_match_sanitized_names() {
        let staging = staging_name("report_pdf");
        let sanitized = crate::document::sanitize_collection_name(&staging);
        assert_eq!(sanitized, "report_pdf_staging");
        assert_ne!(sanitized, staging);
    }
}
