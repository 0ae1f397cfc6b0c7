use axum::http::StatusCode;
use axum::{middleware, routing::get, Router};
use planetcf::api::{self, AppState};
use planetcf::config::Config;
use planetcf::domain;
use planetcf::infrastructure::database::setup_database;
use planetcf::infrastructure::embedding::HttpEmbeddingService;
use planetcf::infrastructure::fetcher::Fetcher;
use planetcf::infrastructure::queue::InProcessQueue;
use planetcf::infrastructure::security_headers::security_headers_middleware;
use planetcf::infrastructure::vector_store::SqliteVectorStore;
use planetcf::infrastructure::{self, scheduler};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planetcf=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("connecting to database: {}", config.database_url);
    let pool = setup_database(&config.database_url).await?;

    tracing::info!("running database migrations");
    sqlx::migrate!().run(&pool).await?;

    let vector_store: Arc<dyn infrastructure::vector_store::VectorStore> =
        Arc::new(SqliteVectorStore::new(pool.clone()));
    let embedding_service: Arc<dyn infrastructure::embedding::EmbeddingService> =
        Arc::new(HttpEmbeddingService::new(
            config.embedding_endpoint.clone(),
            config.embedding_dimensions,
            Duration::from_secs(config.http_timeout_seconds),
        )?);

    let queue = Arc::new(InProcessQueue::new(config.max_retries));
    let fetcher = Arc::new(Fetcher::new(Duration::from_secs(config.http_timeout_seconds))?);

    let ingest_ctx = Arc::new(domain::ingest::IngestContext {
        pool: pool.clone(),
        fetcher,
        vector_store: vector_store.clone(),
        embedding_service: embedding_service.clone(),
        config: config.clone(),
    });

    for worker_id in 0..config.fetcher_concurrency {
        let ctx = ingest_ctx.clone();
        let queue = queue.clone();
        tokio::spawn(async move {
            tracing::debug!(worker_id, "fetcher worker starting");
            domain::ingest::run_worker(ctx, queue).await;
        });
    }

    let scheduler_queue: Arc<dyn infrastructure::queue::Queue> = queue.clone();
    let _scheduler = scheduler::start(
        pool.clone(),
        scheduler_queue,
        vector_store.clone(),
        config.clone(),
    )
    .await?;

    let state = AppState {
        pool,
        config: config.clone(),
        vector_store,
        embedding_service,
    };

    let app = Router::new()
        .route("/", get(api::home::index))
        .route("/feed.atom", get(api::feeds_output::atom))
        .route("/feed.rss", get(api::feeds_output::rss))
        .route("/feeds.opml", get(api::feeds_output::opml))
        .route("/search", get(api::search::search))
        .route("/health", get(api::health::check))
        .fallback(not_found)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = format!("{}:{}", config.host, config.port);
    tracing::info!("planetcf listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
