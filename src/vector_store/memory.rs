use super::{similarity, ChunkRecord, ScoredChunk, VectorStore};
use anyhow::{anyhow, ensure, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    records: Vec<ChunkRecord>,
    // record id -> position in `records`
    index: HashMap<String, usize>,
}

impl Collection {
    fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    fn upsert(&mut self, record: ChunkRecord) {
        match self.index.get(&record.id) {
            Some(&position) => self.records[position] = record,
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.records.len())
    }
}

fn check_dimensions(dimension: usize, records: &[ChunkRecord]) -> Result<()> {
    for record in records {
        ensure!(
            record.vector.len() == dimension,
            "vector for '{}' has {} dimensions, collection expects {}",
            record.id,
            record.vector.len(),
            dimension
        );
    }
    Ok(())
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn exists(&self, collection: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(collection))
    }

    async fn create(&self, collection: &str, dimension: usize) -> Result<()> {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_insert_with(|| Collection::new(dimension));
        Ok(())
    }

    async fn delete(&self, collection: &str) -> Result<()> {
        self.collections.write().remove(collection);
        Ok(())
    }

    async fn put(&self, collection: &str, records: Vec<ChunkRecord>) -> Result<()> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("collection '{collection}' does not exist"))?;
        check_dimensions(target.dimension, &records)?;
        for record in records {
            target.upsert(record);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| anyhow!("collection '{collection}' does not exist"))?;
        ensure!(
            vector.len() == target.dimension,
            "query vector has {} dimensions, collection expects {}",
            vector.len(),
            target.dimension
        );

        let mut scored: Vec<ScoredChunk> = target
            .records
            .iter()
            .map(|r| ScoredChunk {
                id: r.id.clone(),
                text: r.text.clone(),
                score: similarity::cosine(vector, &r.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    // One write lock covers the removal and the insert, so readers see either
    // the old or the new collection.
    async fn promote(&self, staging: &str, collection: &str) -> Result<()> {
        let mut collections = self.collections.write();
        let staged = collections
            .remove(staging)
            .ok_or_else(|| anyhow!("staging collection '{staging}' does not exist"))?;
        collections.insert(collection.to_string(), staged);
        Ok(())
    }
}
