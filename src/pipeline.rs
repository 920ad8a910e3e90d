use crate::answer::Answerer;
use crate::document::{self, DocumentError};
use crate::embedding::Embedder;
use crate::splitter;
use crate::vector_store::{ChunkRecord, ScoredChunk, VectorStore};
use anyhow::anyhow;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_RETRIEVAL_LIMIT: usize = 2;
pub const NO_MATCHES_RESPONSE: &str =
    "Could not find relevant information in the document to answer the question.";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error processing file: {0}")]
    Unreadable(#[from] DocumentError),
    #[error("Document '{0}' not found. Please process it first.")]
    DocumentNotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: splitter::DEFAULT_CHUNK_SIZE,
            chunk_overlap: splitter::DEFAULT_CHUNK_OVERLAP,
            retrieval_limit: DEFAULT_RETRIEVAL_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
    pub collection: String,
    pub chunks: usize,
}

/// Ingestion and question answering over shared model and store handles.
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    answerer: Arc<dyn Answerer>,
    options: PipelineOptions,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        answerer: Arc<dyn Answerer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            answerer,
            options,
        }
    }

    /// Extracts, chunks and embeds a PDF, then makes it the whole content of
    /// the collection named after `filename`.
    pub async fn process_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ProcessedDocument, PipelineError> {
        let extract = move || document::extract_text(&bytes);
        let text = tokio::task::spawn_blocking(extract)
            .await
            .map_err(|e| DocumentError::Unreadable(e.to_string()))??;
        self.process_text(filename, &text).await
    }

    /// Chunks, embeds and stores already-extracted text.
    pub async fn process_text(
        &self,
        name: &str,
        text: &str,
    ) -> Result<ProcessedDocument, PipelineError> {
        let collection = document::sanitize_collection_name(name);
        let options = self.options;
        let chunks = splitter::split(text, options.chunk_size, options.chunk_overlap)?;
        tracing::info!("'{}' split into {} chunks", name, chunks.len());

        let embedder = Arc::clone(&self.embedder);
        let (chunks, vectors) = tokio::task::spawn_blocking(move || {
            let vectors = embedder.embed(&chunks)?;
            Ok::<_, anyhow::Error>((chunks, vectors))
        })
        .await
        .map_err(|e| anyhow!("embedding task failed: {e}"))??;
        if vectors.len() != chunks.len() {
            return Err(anyhow!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )
            .into());
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, vector))| ChunkRecord {
                id: ChunkRecord::chunk_id(i),
                text,
                vector,
            })
            .collect();
        let count = records.len();

        let dimension = self.embedder.dimension();
        self.store.replace(&collection, dimension, records).await?;
        tracing::info!("stored {} chunks in collection '{}'", count, collection);

        Ok(ProcessedDocument {
            collection,
            chunks: count,
        })
    }

    /// Returns the chunks of `document_name` nearest to `question`.
    pub async fn retrieve(
        &self,
        question: &str,
        document_name: &str,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let collection = document::sanitize_collection_name(document_name);
        if !self.store.exists(&collection).await? {
            return Err(PipelineError::DocumentNotFound(document_name.to_string()));
        }

        let embedder = Arc::clone(&self.embedder);
        let question = question.to_string();
        let embed = move || embedder.embed_one(&question);
        let vector = tokio::task::spawn_blocking(embed)
            .await
            .map_err(|e| anyhow!("embedding task failed: {e}"))??;

        let limit = self.options.retrieval_limit;
        let matches = self.store.query(&collection, &vector, limit).await?;
        tracing::debug!("retrieved {} chunks from '{}'", matches.len(), collection);
        Ok(matches)
    }

    /// Answers `question` from the nearest chunks of `document_name`.
    pub async fn query(
        &self,
        question: &str,
        document_name: &str,
    ) -> Result<String, PipelineError> {
        let matches = self.retrieve(question, document_name).await?;
        if matches.is_empty() {
            return Ok(NO_MATCHES_RESPONSE.to_string());
        }

        let context: Vec<String> = matches.into_iter().map(|m| m.text).collect();
        Ok(self.answerer.answer(&context, question).await?)
    }
}
