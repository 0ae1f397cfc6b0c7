pub mod error;
pub mod feeds_output;
pub mod health;
pub mod home;
pub mod search;

use crate::config::Config;
use crate::infrastructure::embedding::EmbeddingService;
use crate::infrastructure::vector_store::VectorStore;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub vector_store: Arc<dyn VectorStore>,
    pub embedding_service: Arc<dyn EmbeddingService>,
}
