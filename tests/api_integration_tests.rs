use axum::http::StatusCode;
use axum::Router;
use axum::routing::get;
use axum_test::TestServer;
use planetcf::api::{self, AppState};
use planetcf::config::Config;
use planetcf::infrastructure::embedding::{EmbeddingError, EmbeddingService};
use planetcf::infrastructure::vector_store::{ScoredHit, SqliteVectorStore, VectorStoreError};
use planetcf::infrastructure::{database, vector_store::VectorStore};
use sqlx::SqlitePool;
use std::sync::Arc;

struct NullEmbeddingService;

#[async_trait::async_trait]
impl EmbeddingService for NullEmbeddingService {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![0.0; 8])
    }
}

/// Stands in for a downed remote Vector Store backend.
struct FailingVectorStore;

#[async_trait::async_trait]
impl VectorStore for FailingVectorStore {
    async fn upsert(&self, _entry_id: i64, _embedding: &[f32], _title_prefix: &str) -> Result<(), VectorStoreError> {
        Err(VectorStoreError::DimensionMismatch { expected: 8, actual: 0 })
    }

    async fn delete(&self, _entry_id: i64) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn query(&self, _query: &[f32], _top_k: usize) -> Result<Vec<ScoredHit>, VectorStoreError> {
        Err(VectorStoreError::DimensionMismatch { expected: 8, actual: 0 })
    }
}

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        port: 3000,
        host: "127.0.0.1".to_string(),
        content_days: 7,
        fallback_entries: 50,
        http_timeout_seconds: 30,
        feed_timeout_seconds: 60,
        max_entries_per_feed: 50,
        retention_max_per_feed: 100,
        retention_days: 90,
        feed_failure_threshold: 3,
        feed_auto_deactivate_threshold: 10,
        embedding_dimensions: 8,
        embedding_endpoint: "http://127.0.0.1:0/embed".to_string(),
        schedule: "0 0 * * * *".to_string(),
        max_retries: 5,
        fetcher_concurrency: 1,
    }
}

async fn setup_test_app() -> (TestServer, SqlitePool) {
    setup_test_app_with_vector_store(|pool| Arc::new(SqliteVectorStore::new(pool))).await
}

async fn setup_test_app_with_vector_store(
    make_vector_store: impl FnOnce(SqlitePool) -> Arc<dyn VectorStore>,
) -> (TestServer, SqlitePool) {
    let pool = database::setup_database("sqlite::memory:")
        .await
        .expect("in-memory database should always open");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("migrations should apply cleanly to a fresh database");

    let vector_store = make_vector_store(pool.clone());
    let embedding_service: Arc<dyn EmbeddingService> = Arc::new(NullEmbeddingService);

    let state = AppState {
        pool: pool.clone(),
        config: test_config(),
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
        .with_state(state);

    let server = TestServer::new(app).unwrap();
    (server, pool)
}

#[tokio::test]
async fn health_check_reports_ok() {
    let (server, _pool) = setup_test_app().await;
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("\"status\":\"ok\""));
}

#[tokio::test]
async fn home_page_renders_fallback_notice_when_empty() {
    let (server, _pool) = setup_test_app().await;
    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response
        .header("content-type")
        .to_str()
        .unwrap()
        .contains("text/html"));
}

#[tokio::test]
async fn search_rejects_short_queries() {
    let (server, _pool) = setup_test_app().await;
    let response = server.get("/search?q=a").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_with_empty_index_returns_empty_results_not_an_error() {
    let (server, _pool) = setup_test_app().await;
    let response = server.get("/search?q=rust").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn search_with_failing_vector_store_returns_empty_results_not_an_error() {
    let (server, _pool) = setup_test_app_with_vector_store(|_pool| Arc::new(FailingVectorStore)).await;
    let response = server.get("/search?q=rust").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn opml_export_sets_attachment_disposition() {
    let (server, _pool) = setup_test_app().await;
    let response = server.get("/feeds.opml").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("attachment"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let (server, _pool) = setup_test_app().await;
    let response = server.get("/does-not-exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
