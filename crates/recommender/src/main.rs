//! PaperRank Recommender
//!
//! Batch job: loads the user's library and today's candidates, ranks the
//! candidates, optionally asks the LLM for TL;DRs of the top papers, and
//! writes the ranked list as JSON.
//!
//! Usage: `recommend [config-file]`. Without an argument configuration comes
//! from `config/` and `APP__*` environment variables.

use paperrank_common::{
    config::{AppConfig, ObservabilityConfig},
    llm::{Llm, LlmHandle},
    metrics::register_metrics,
    VERSION,
};
use paperrank_recommender::{
    candidate::load_candidates,
    corpus::load_corpus,
    digest::{summarize_top, DigestOptions},
    Reranker,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::load()?,
    };

    init_tracing(&config.observability);
    info!(service = %config.observability.service_name, "Starting PaperRank recommender v{}", VERSION);
    register_metrics();

    let corpus = load_corpus(&config.rerank.corpus_path).await?;
    let mut candidates = load_candidates(&config.rerank.candidates_path).await?;

    let reranker = Reranker::from_registry(&config.embedding.model, &config.embedding)?
        .with_zero_vector_policy(config.rerank.zero_vector_policy);

    let mut ranked = reranker.rerank(&mut candidates, &corpus).await.map_err(|e| {
        if e.is_input_error() {
            error!(code = ?e.code(), error = %e, "Invalid input data");
        } else {
            error!(code = ?e.code(), error = %e, "Reranking failed");
        }
        e
    })?;

    let options = DigestOptions::from(&config.rerank);
    if options.top_k > 0 && !ranked.is_empty() {
        let llm_config = config.llm.clone();
        let handle = LlmHandle::with_factory(move || Llm::new(&llm_config));
        let llm = handle.get()?;
        info!(backend = llm.backend_kind(), model = llm.model(), "Generating TL;DRs");
        summarize_top(&llm, &mut ranked, options).await;
    }

    let json = serde_json::to_string_pretty(&ranked)?;
    match &config.rerank.output_path {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!(path = %path, papers = ranked.len(), "Wrote recommendations");
        }
        None => println!("{}", json),
    }

    Ok(())
}
