//! RAG server binary
//!
//! Run with: cargo run -p session-rag --bin session-rag-server

use session_rag::{
    config::{EmbeddingBackend, GeneratorBackend, RagConfig},
    server::RagServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::load()?;
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedder: {:?} ({} dimensions)", config.embeddings.provider, config.embeddings.dimensions);
    tracing::info!("  - Generator: {:?}", config.llm.generator);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let uses_ollama = config.embeddings.provider == EmbeddingBackend::Ollama
        || config.llm.generator == GeneratorBackend::Ollama;
    if uses_ollama {
        tracing::info!("Checking Ollama at {}...", config.llm.base_url);
        let client = reqwest::Client::new();
        match client.get(format!("{}/api/tags", config.llm.base_url)).send().await {
            Ok(resp) if resp.status().is_success() => tracing::info!("Ollama is running"),
            _ => {
                tracing::warn!("Ollama not available at {}", config.llm.base_url);
                tracing::warn!("Answers will fall back to extractive mode until it is reachable");
            }
        }
    }

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/ingest     - Ingest extracted text");
    println!("  POST   /api/upload     - Upload a text file");
    println!("  POST   /api/query      - Ask a question");
    println!("  GET    /api/documents  - List documents");
    println!("  DELETE /api/documents  - Clear the session");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
