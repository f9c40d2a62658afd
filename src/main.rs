use std::error::Error;
use std::sync::Arc;

use llm_service::{LlmModelConfig, LlmService};
use rag_index::{IndexConfig, OpenAiEmbedder, OpenAiEmbedderConfig, VectorIndex};
use research_pipeline::{PipelineConfig, ResearchPipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file if present.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let query = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LEGAL_QUERY").ok())
        .ok_or("usage: legal-ai-backend \"<legal query>\" (or set LEGAL_QUERY)")?;

    let llm = Arc::new(LlmService::new(LlmModelConfig::from_env()?)?);

    let index_cfg = IndexConfig::from_env();
    let mut embedder_cfg = OpenAiEmbedderConfig::new(std::env::var("OPENAI_API_KEY")?);
    embedder_cfg.dim = index_cfg.embedding_dim;
    let embedder = Arc::new(OpenAiEmbedder::new(embedder_cfg)?);
    let index = VectorIndex::new(index_cfg, embedder)?;

    let pipeline = ResearchPipeline::new(index, llm.clone(), PipelineConfig::from_env());

    let report = pipeline.ensure_index().await?;
    if report.skipped {
        tracing::info!("using existing index ({})", report.reason);
    } else {
        tracing::info!(
            "indexed {} chunks from {} documents",
            report.chunks_indexed,
            report.documents
        );
    }

    let state = pipeline.answer(&query).await?;
    println!("{}", state.final_response);

    let usage = llm.usage_report();
    tracing::info!(
        "session usage: {} tokens across {} model(s), est. ${:.4}",
        usage.total_tokens,
        usage.models.len(),
        usage.total_cost
    );

    Ok(())
}
