//! `search(query, top_k)`: embed the query once, ask the Vector Store for
//! the nearest neighbors, then hydrate from the Relational Store. Hits
//! whose entries have since been deleted are dropped rather than surfaced
//! as holes.

use crate::domain::models::SearchHit;
use crate::infrastructure::embedding::EmbeddingService;
use crate::infrastructure::repository;
use crate::infrastructure::vector_store::VectorStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] crate::infrastructure::embedding::EmbeddingError),

    #[error("vector store query failed: {0}")]
    VectorStore(#[from] crate::infrastructure::vector_store::VectorStoreError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn search(
    pool: &SqlitePool,
    embedding_service: &Arc<dyn EmbeddingService>,
    vector_store: &Arc<dyn VectorStore>,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>, SearchError> {
    let query_vector = embedding_service.embed(query).await?;
    let hits = vector_store.query(&query_vector, top_k).await?;

    let entry_ids: Vec<i64> = hits.iter().map(|h| h.entry_id).collect();
    let hydrated = repository::hydrate_entries(pool, &entry_ids).await?;
    let by_id: std::collections::HashMap<i64, (crate::domain::models::Entry, String)> =
        hydrated.into_iter().map(|(e, t)| (e.id, (e, t))).collect();

    // Preserve vector-score order; drop hits whose entry vanished since
    // indexing (retention sweep, cascading feed delete).
    let results = hits
        .into_iter()
        .filter_map(|hit| {
            by_id.get(&hit.entry_id).map(|(entry, feed_title)| SearchHit {
                id: entry.id,
                title: entry.title.clone(),
                url: entry.url.clone(),
                author: entry.author.clone(),
                published_at: entry.published_at,
                score: hit.score,
                feed_title: feed_title.clone(),
            })
        })
        .collect();

    Ok(results)
}
