use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use rag_chat::config::AppConfig;
use rag_chat::indexer::builder::{BuildOptions, IndexBuilder};
use rag_chat::providers::embedding_provider;
use rag_chat::rag::KnowledgeBaseStore;

#[derive(Parser, Debug)]
#[command(name = "kb-builder")]
#[command(about = "Build the knowledge base served by rag-chat")]
struct Args {
    /// Source document (PDF or plain text)
    #[arg(short, long, env = "RAG_CHAT_SOURCE")]
    source: Option<PathBuf>,

    /// Output file for the chunk texts
    #[arg(long)]
    chunks_out: Option<PathBuf>,

    /// Output file for the chunk vectors
    #[arg(long)]
    vectors_out: Option<PathBuf>,

    /// Maximum chunk size in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Overlap between chunks in characters
    #[arg(long)]
    chunk_overlap: Option<usize>,

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
    if let Err(e) = run(args).await {
        tracing::error!("Build failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = AppConfig::load(args.config.as_deref())?;
    if let Some(source) = args.source {
        cfg.ingestion.source_path = source;
    }
    if let Some(path) = args.chunks_out {
        cfg.knowledge_base.chunks_path = path;
    }
    if let Some(path) = args.vectors_out {
        cfg.knowledge_base.vectors_path = path;
    }
    if let Some(size) = args.chunk_size {
        cfg.ingestion.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        cfg.ingestion.chunk_overlap = overlap;
    }
    cfg.validate()?;

    let embedder = embedding_provider(&cfg)?;
    let store = KnowledgeBaseStore::new(&cfg.knowledge_base.chunks_path, &cfg.knowledge_base.vectors_path);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let builder = IndexBuilder::new(embedder, BuildOptions::from(&cfg.ingestion)).with_progress(pb);
    let kb = builder.build(&cfg.ingestion.source_path, &store).await?;

    tracing::info!(
        "Done. Wrote {} chunks ({} dimensions) to {} and {}",
        kb.len(),
        kb.dimension().unwrap_or(0),
        store.chunks_path().display(),
        store.vectors_path().display()
    );
    Ok(())
}
