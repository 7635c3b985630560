use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rag_chat::config::AppConfig;
use rag_chat::providers::{embedding_provider, generation_provider};
use rag_chat::rag::{KnowledgeBaseStore, RagOrchestrator, RetrievalService, VectorIndex};
use rag_chat::retry::RetryPolicy;
use rag_chat::server::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "rag-chat")]
#[command(about = "Serve the DigiTickets RAG chat assistant")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, env = "RAG_CHAT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = AppConfig::load(args.config.as_deref())?;
    cfg.require_serving_credentials()?;

    // The knowledge base is loaded once and shared read-only by every request.
    let store = KnowledgeBaseStore::new(&cfg.knowledge_base.chunks_path, &cfg.knowledge_base.vectors_path);
    let index = Arc::new(VectorIndex::new(store.load()?));

    let retrieval = RetrievalService::new(embedding_provider(&cfg)?, index).with_retry(RetryPolicy::new(
        cfg.retrieval.embed_attempts,
        Duration::from_millis(cfg.retrieval.embed_backoff_ms),
    ));
    let orchestrator = RagOrchestrator::new(retrieval, generation_provider(&cfg)?)
        .with_top_k(cfg.retrieval.top_k);

    let app = router(Arc::new(AppState { orchestrator }));

    let listener = tokio::net::TcpListener::bind((cfg.server.host.as_str(), cfg.server.port)).await?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
