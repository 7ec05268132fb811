use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{info, warn};

use pdf_rag_server::config::Settings;
use pdf_rag_server::database::{DbPool, Repository};
use pdf_rag_server::document::tokenizer::{HeuristicCounter, TiktokenCounter, TokenCounter};
use pdf_rag_server::handlers;
use pdf_rag_server::logging::{ActivityLogger, LoggerConfig};
use pdf_rag_server::services::{
    ChatService, EmbeddingService, RagEngine, SearchProvider, WebSearchService,
};
use pdf_rag_server::state::AppState;
use pdf_rag_server::utils::limiters::Limiters;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,pdf_rag_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("🚀 Starting PDF RAG server...");

    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let db_pool = DbPool::new(&settings.index).await?;
    let repository = Arc::new(Repository::new(db_pool));
    repository.init_schema().await?;
    repository
        .ensure_embedder_meta(
            &settings.index.path,
            &settings.embedding.model,
            settings.embedding.dimension,
        )
        .await?;
    info!("✅ Vector index ready");

    let limiters = Arc::new(Limiters::new(&settings.limits));

    let embedder = Arc::new(EmbeddingService::new(
        settings.embedding.clone(),
        limiters.clone(),
    ));
    let chat = Arc::new(ChatService::new(settings.chat.clone(), limiters.clone()));

    let web_search: Option<Arc<dyn SearchProvider>> = if settings.web_search.enabled {
        Some(Arc::new(WebSearchService::new(settings.web_search.clone())))
    } else {
        None
    };

    let counter: Arc<dyn TokenCounter> = match TiktokenCounter::cl100k() {
        Ok(counter) => Arc::new(counter),
        Err(e) => {
            warn!("BPE tokenizer unavailable ({}), using word heuristic", e);
            Arc::new(HeuristicCounter)
        }
    };

    let logger = ActivityLogger::new(
        repository.clone(),
        LoggerConfig {
            queue_capacity: settings.limits.logger_queue_capacity,
            batch_size: settings.limits.logger_batch_size,
            batch_timeout_ms: settings.limits.logger_batch_timeout_ms,
        },
    );

    let engine = Arc::new(RagEngine::new(
        &settings,
        repository,
        embedder,
        chat,
        web_search,
        counter,
        limiters,
        logger,
    ));

    let app = build_router(AppState { engine });

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/api/ingest", post(handlers::ingest::ingest_handler))
        .route("/api/upload", post(handlers::ingest::upload_handler))
        .route("/api/ask", post(handlers::ask::ask_handler))
        .route("/api/reset", delete(handlers::admin::reset_handler))
        .route("/api/status", get(handlers::admin::status_handler))
        .with_state(state)
        // CORS
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        // Body limit (PDF uploads - max 50MB)
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
}
