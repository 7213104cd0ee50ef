//! textsift — text analysis service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at configured level
//!   4. Connect the PostgreSQL pool and ensure the schema
//!   5. Build the LLM provider and keyword extractor
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Serve HTTP until shutdown

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

use textsift::error::AppError;
use textsift::http::{self, AppState, ServiceInfo};
use textsift::nlp::KeywordExtractor;
use textsift::storage::AnalysisStore;
use textsift::{config, llm, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    // Optional config path as the first CLI argument.
    let config_path = std::env::args().nth(1);
    let config = config::load(config_path.as_deref())?;

    logger::parse_level(&config.service.log_level)?;
    logger::init(&config.service.log_level)?;

    info!(
        service = %config.service.name,
        bind = %config.service.bind,
        log_level = %config.service.log_level,
        llm_provider = %config.llm.provider,
        "config loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
        .connect(&config.database.url)
        .await?;

    let store = AnalysisStore::new(pool);
    store.init_schema().await?;
    info!("database schema ready");

    let provider = llm::providers::build(&config.llm, config.llm_api_key.clone())?;
    let extractor = Arc::new(KeywordExtractor::new(config.nlp.min_word_length));

    let state = AppState {
        service: Arc::new(ServiceInfo::new(config.service.name.clone())),
        llm: provider,
        extractor,
        store,
        top_keywords: config.nlp.top_keywords,
    };

    // Shared shutdown token — Ctrl-C cancels it, the server watches it.
    let shutdown = CancellationToken::new();
    let watcher = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            watcher.cancel();
        }
    });

    http::serve(&config.service.bind, state, shutdown).await?;

    info!("bye");
    Ok(())
}
