use crate::answer::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use crate::pipeline::{PipelineOptions, DEFAULT_RETRIEVAL_LIMIT};
use crate::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://localhost:5174",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
];

#[derive(Debug, Clone, PartialEq)]
pub enum StoreKind {
    Memory,
    Qdrant { url: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store: StoreKind,
    pub embedding_model_dir: Option<PathBuf>,
    pub ollama_url: String,
    pub ollama_model: String,
    pub pipeline: PipelineOptions,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Reads the configuration from the process environment. Call
    /// `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store_kind = var("VECTOR_STORE", "memory").to_ascii_lowercase();
        let store = match store_kind.as_str() {
            "memory" => StoreKind::Memory,
            "qdrant" => StoreKind::Qdrant {
                url: var("QDRANT_URL", DEFAULT_QDRANT_URL),
            },
            other => bail!("VECTOR_STORE must be 'memory' or 'qdrant', got '{other}'"),
        };

        let pipeline = PipelineOptions {
            chunk_size: parse_var(&lookup, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_var(&lookup, "CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            retrieval_limit: parse_var(&lookup, "RETRIEVAL_LIMIT", DEFAULT_RETRIEVAL_LIMIT)?,
        };
        if pipeline.chunk_overlap >= pipeline.chunk_size {
            bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                pipeline.chunk_overlap,
                pipeline.chunk_size
            );
        }

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(origins) => origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.map(String::from).to_vec(),
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR", DEFAULT_BIND_ADDR),
            store,
            embedding_model_dir: lookup("EMBEDDING_MODEL_DIR").map(PathBuf::from),
            ollama_url: var("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            ollama_model: var("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            pipeline,
            cors_origins,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}
