use super::{ChunkRecord, ScoredChunk, VectorStore};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateAliasBuilder, CreateCollectionBuilder, DeleteCollectionBuilder, Distance, PointStruct,
    ScalarQuantizationBuilder, ScoredPoint, SearchParamsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use uuid::Uuid;

const CHUNK_ID_KEY: &str = "chunk_id";
const TEXT_KEY: &str = "text";

/// Collections backed by a Qdrant server.
///
/// Every logical collection is an alias pointing at a uniquely named physical
/// collection, so a replacement can be switched in with one alias update.
pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client })
    }

    /// Physical collection currently behind the alias `collection`.
    async fn resolve(&self, collection: &str) -> Result<Option<String>> {
        let aliases = self.client.list_aliases().await?;
        Ok(aliases
            .aliases
            .into_iter()
            .find(|a| a.alias_name == collection)
            .map(|a| a.collection_name))
    }
}

fn physical_name(collection: &str) -> String {
    format!("{}-{}", collection, Uuid::new_v4().simple())
}

// Qdrant only accepts integer or UUID point ids.
fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

fn payload_str(point: &ScoredPoint, key: &str) -> String {
    match point.payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

fn scored_chunk(point: &ScoredPoint) -> ScoredChunk {
    ScoredChunk {
        id: payload_str(point, CHUNK_ID_KEY),
        text: payload_str(point, TEXT_KEY),
        score: point.score,
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn exists(&self, collection: &str) -> Result<bool> {
        Ok(self.resolve(collection).await?.is_some())
    }

    async fn create(&self, collection: &str, dimension: usize) -> Result<()> {
        if self.exists(collection).await? {
            tracing::debug!(
                "'{}' collection already exists in Qdrant; do not create",
                collection
            );
            return Ok(());
        }

        let physical = physical_name(collection);
        let vectors = VectorParamsBuilder::new(dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&physical)
                    .vectors_config(vectors)
                    .quantization_config(ScalarQuantizationBuilder::default()),
            )
            .await?;
        self.client
            .create_alias(CreateAliasBuilder::new(&physical, collection))
            .await?;
        tracing::info!(
            "created collection '{}' ({}) in Qdrant",
            collection,
            physical
        );
        Ok(())
    }

    async fn delete(&self, collection: &str) -> Result<()> {
        if let Some(physical) = self.resolve(collection).await? {
            self.client.delete_alias(collection).await?;
            self.client
                .delete_collection(DeleteCollectionBuilder::new(&physical))
                .await?;
            tracing::info!("deleted collection '{}' from Qdrant", collection);
        }
        Ok(())
    }

    async fn put(&self, collection: &str, records: Vec<ChunkRecord>) -> Result<()> {
        let points = records
            .into_iter()
            .map(|record| {
                let payload = Payload::try_from(json!({
                    CHUNK_ID_KEY: record.id,
                    TEXT_KEY: record.text,
                }))?;
                Ok(PointStruct::new(
                    point_id(&record.id),
                    record.vector,
                    payload,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
                    .with_payload(true)
                    .params(SearchParamsBuilder::default().exact(true)),
            )
            .await?;

        Ok(search_result.result.iter().map(scored_chunk).collect())
    }

    // Creating an alias that already exists reassigns it in a single server-side
    // operation, so searches hit either the old or the new physical collection.
    async fn promote(&self, staging: &str, collection: &str) -> Result<()> {
        let staged = self
            .resolve(staging)
            .await?
            .ok_or_else(|| anyhow!("staging collection '{staging}' does not exist"))?;
        let previous = self.resolve(collection).await?;

        self.client
            .create_alias(CreateAliasBuilder::new(&staged, collection))
            .await?;
        self.client.delete_alias(staging).await?;

        if let Some(previous) = previous {
            self.client
                .delete_collection(DeleteCollectionBuilder::new(&previous))
                .await?;
        }
        tracing::info!("collection '{}' now served by {}", collection, staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::Value;
    use std::collections::HashMap;

    fn point(payload: &[(&str, &str)], score: f32) -> ScoredPoint {
        let payload: HashMap<String, Value> = payload
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect();
        ScoredPoint {
            payload,
            score,
            ..Default::default()
        }
    }

    #[test]
    fn point_ids_are_stable_uuids() {
        let a = point_id("chunk_0");
        assert_eq!(a, point_id("chunk_0"));
        assert_ne!(a, point_id("chunk_1"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn physical_names_are_unique_per_collection() {
        let a = physical_name("report_pdf");
        let b = physical_name("report_pdf");
        assert!(a.starts_with("report_pdf-"));
        assert_ne!(a, b);
    }

    #[test]
    fn payload_maps_to_scored_chunk() {
        let chunk = scored_chunk(&point(
            &[(CHUNK_ID_KEY, "chunk_3"), (TEXT_KEY, "Paris is in France.")],
            0.75,
        ));
        assert_eq!(
            chunk,
            ScoredChunk {
                id: "chunk_3".to_string(),
                text: "Paris is in France.".to_string(),
                score: 0.75,
            }
        );
    }

    #[test]
    fn missing_payload_keys_become_empty() {
        let chunk = scored_chunk(&point(&[(TEXT_KEY, "orphan text")], 0.1));
        assert_eq!(chunk.id, "");
        assert_eq!(chunk.text, "orphan text");

        let empty = scored_chunk(&point(&[], 0.0));
        assert_eq!(empty.id, "");
        assert_eq!(empty.text, "");
    }

    #[test]
    fn non_string_payload_values_become_empty() {
        let mut scored = point(&[(CHUNK_ID_KEY, "chunk_0")], 0.5);
        let number = Value::from(42_i64);
        scored.payload.insert(TEXT_KEY.to_string(), number);
        assert_eq!(scored_chunk(&scored).text, "");
    }
}
