//! Vector Store: an opaque numeric fingerprint per entry, reached only
//! through this trait so the default in-process SQLite backend can be
//! swapped for a remote store without touching the Fetcher or Renderer.

use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub entry_id: i64,
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upserts the vector for an entry, along with the small metadata the
    /// spec names (title prefix, entry id).
    async fn upsert(
        &self,
        entry_id: i64,
        embedding: &[f32],
        title_prefix: &str,
    ) -> Result<(), VectorStoreError>;

    async fn delete(&self, entry_id: i64) -> Result<(), VectorStoreError>;

    /// Returns the `top_k` nearest vectors to `query`, in descending score
    /// order.
    async fn query(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredHit>, VectorStoreError>;
}

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn encode(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MIN;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(
        &self,
        entry_id: i64,
        embedding: &[f32],
        title_prefix: &str,
    ) -> Result<(), VectorStoreError> {
        let bytes = encode(embedding);
        let id_str = entry_id.to_string();
        sqlx::query(
            "INSERT INTO vectors (entry_id, embedding, title_prefix, created_at)
             VALUES (?, ?, ?, datetime('now'))
             ON CONFLICT(entry_id) DO UPDATE SET
                embedding = excluded.embedding,
                title_prefix = excluded.title_prefix",
        )
        .bind(id_str)
        .bind(bytes)
        .bind(title_prefix)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, entry_id: i64) -> Result<(), VectorStoreError> {
        sqlx::query("DELETE FROM vectors WHERE entry_id = ?")
            .bind(entry_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredHit>, VectorStoreError> {
        let rows: Vec<(String, Vec<u8>)> =
            sqlx::query_as("SELECT entry_id, embedding FROM vectors")
                .fetch_all(&self.pool)
                .await?;

        let mut scored: Vec<ScoredHit> = rows
            .into_iter()
            .filter_map(|(id, bytes)| {
                let embedding = decode(&bytes);
                let score = cosine_similarity(query, &embedding);
                id.parse::<i64>().ok().map(|entry_id| ScoredHit { entry_id, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let original = vec![0.5_f32, -1.25, 3.0];
        let bytes = encode(&original);
        let decoded = decode(&bytes);
        assert_eq!(original, decoded);
    }

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0_f32, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_mismatched_lengths_is_minimal() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), f32::MIN);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
