//! Retention sweep: atomic with respect to readers in the sense that each
//! entry delete is a single statement readers either see or don't, never a
//! half-written row. Vector deletes run first and are best-effort — a
//! vector outliving its entry is recoverable on the next sweep; an entry
//! outliving its vector is not, so the order never inverts.

use crate::config::Config;
use crate::infrastructure::repository;
use crate::infrastructure::vector_store::VectorStore;
use sqlx::SqlitePool;
use std::sync::Arc;

const BATCH_SIZE: i64 = 500;

pub struct RetentionReport {
    pub deleted: usize,
}

/// How many rows the sweep may delete before the global floor
/// (`fallback_entries`) is hit. The Renderer's home-page fallback depends
/// on there always being at least that many entries to fall back to.
fn deletable_budget(total_entries: i64, fallback_entries: i64) -> i64 {
    (total_entries - fallback_entries).max(0)
}

pub async fn sweep(
    pool: &SqlitePool,
    vector_store: &Arc<dyn VectorStore>,
    config: &Config,
) -> Result<RetentionReport, sqlx::Error> {
    let mut deleted = 0usize;
    let total_entries = repository::count_entries(pool).await?;
    let budget = deletable_budget(total_entries, config.fallback_entries);

    loop {
        let remaining_budget = budget - deleted as i64;
        if remaining_budget <= 0 {
            break;
        }
        let batch_limit = BATCH_SIZE.min(remaining_budget);

        let candidates = repository::retention_candidates(
            pool,
            config.retention_days,
            config.retention_max_per_feed,
            batch_limit,
        )
        .await?;

        if candidates.is_empty() {
            break;
        }

        for entry_id in &candidates {
            if let Err(e) = vector_store.delete(*entry_id).await {
                tracing::warn!(entry_id, "vector delete failed during retention sweep: {e}");
            }
        }

        repository::delete_entries(pool, &candidates).await?;
        deleted += candidates.len();

        if (candidates.len() as i64) < batch_limit {
            break;
        }
    }

    Ok(RetentionReport { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_is_bounded() {
        assert!(BATCH_SIZE > 0 && BATCH_SIZE <= 1000);
    }

    #[test]
    fn deletable_budget_never_goes_negative() {
        assert_eq!(deletable_budget(30, 50), 0);
    }

    #[test]
    fn deletable_budget_is_the_surplus_above_the_floor() {
        assert_eq!(deletable_budget(120, 50), 70);
    }
}
