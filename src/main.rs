use anyhow::Result;
use document_qa_service::all_minilm_l6_v2::MODEL_NAME;
use document_qa_service::answer::OllamaAnswerer;
use document_qa_service::api;
use document_qa_service::config::{Config, StoreKind};
use document_qa_service::embedding::FastEmbedder;
use document_qa_service::pipeline::RagPipeline;
use document_qa_service::vector_store::{MemoryStore, QdrantStore, VectorStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    tracing::info!("server is starting up: loading {}", MODEL_NAME);
    let model_dir = config.embedding_model_dir.clone();
    let load = move || FastEmbedder::new(model_dir.as_deref());
    let embedder = tokio::task::spawn_blocking(load).await??;

    let store: Arc<dyn VectorStore> = match &config.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Qdrant { url } => {
            tracing::info!("using Qdrant at {}", url);
            Arc::new(QdrantStore::new(url)?)
        }
    };
    let answerer = OllamaAnswerer::new(&config.ollama_url, &config.ollama_model);

    let state = Arc::new(RagPipeline::new(
        Arc::new(embedder),
        store,
        Arc::new(answerer),
        config.pipeline,
    ));
    let app = api::router(state, api::cors_layer(&config.cors_origins)?);
    tracing::info!("startup complete: models are loaded and ready");

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("server running on http://{}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server is shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
