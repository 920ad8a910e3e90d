use crate::all_minilm_l6_v2;
use crate::embedding_model_factory;
use anyhow::{bail, ensure, Result};
use fastembed::TextEmbedding;
use std::path::Path;

const SAMPLE_TEXT: &str = "dimension check";

/// Turns text into fixed-size vectors. Implementations are shared across
/// requests and called from blocking threads.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed(&[text.to_string()])?;
        ensure!(
            embeddings.len() == 1,
            "embedder returned {} vectors for one text",
            embeddings.len()
        );
        Ok(embeddings.remove(0))
    }
}

pub struct FastEmbedder {
    model: TextEmbedding,
    dimension: usize,
}

impl FastEmbedder {
    /// Loads the model and embeds a sample text to learn its output size.
    pub fn new(model_dir: Option<&Path>) -> Result<Self> {
        let model = embedding_model_factory::get_model(model_dir)?;
        let sample = model.embed(vec![SAMPLE_TEXT], None)?;
        let dimension = vector_dimension(&sample)?;
        if dimension != all_minilm_l6_v2::VECTOR_SIZE {
            tracing::warn!(
                "embedding model produces {} dimensions, {} has {}",
                dimension,
                all_minilm_l6_v2::MODEL_NAME,
                all_minilm_l6_v2::VECTOR_SIZE
            );
        }
        tracing::info!("embedding dimension: {}", dimension);
        Ok(Self { model, dimension })
    }
}

fn vector_dimension(embeddings: &[Vec<f32>]) -> Result<usize> {
    match embeddings {
        [vector] if !vector.is_empty() => Ok(vector.len()),
        [_] => bail!("embedding model returned an empty vector"),
        _ => bail!("expected one embedding, got {}", embeddings.len()),
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.model.embed(texts.to_vec(), None)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
