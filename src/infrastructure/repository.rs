//! Relational Store access. Every query here is its own statement — no
//! long-held transactions — per the concurrency model's shared-resource
//! policy: the only writers are the Fetcher (health + entries) and the
//! Scheduler (retention).

use crate::domain::models::{DeadLetter, Entry, Feed, NewEntry, UpsertOutcome};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub async fn list_active_feeds(pool: &SqlitePool) -> Result<Vec<Feed>, sqlx::Error> {
    sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE is_active = 1 ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn get_feed(pool: &SqlitePool, feed_id: i64) -> Result<Option<Feed>, sqlx::Error> {
    sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE id = ?")
        .bind(feed_id)
        .fetch_optional(pool)
        .await
}

/// Rewrites a feed's stored URL after a permanent redirect succeeded.
pub async fn rewrite_feed_url(
    pool: &SqlitePool,
    feed_id: i64,
    new_url: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE feeds SET url = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(new_url)
        .bind(feed_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Records a successful fetch: clears the error state, resets the failure
/// counter, refreshes cache validators, and advances `last_entry_at` when a
/// newer published entry was just processed.
#[allow(clippy::too_many_arguments)]
pub async fn record_fetch_success(
    pool: &SqlitePool,
    feed_id: i64,
    etag: Option<&str>,
    last_modified: Option<&str>,
    max_published_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE feeds SET
            fetch_error = NULL,
            consecutive_failures = 0,
            etag = COALESCE(?, etag),
            last_modified = COALESCE(?, last_modified),
            last_fetch_at = datetime('now'),
            last_success_at = datetime('now'),
            last_entry_at = COALESCE(?, last_entry_at),
            updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(etag)
    .bind(last_modified)
    .bind(max_published_at)
    .bind(feed_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Records a failed fetch attempt: increments both failure counters,
/// stores a truncated error message, and auto-deactivates the feed once
/// `consecutive_failures` reaches `auto_deactivate_threshold`.
pub async fn record_fetch_failure(
    pool: &SqlitePool,
    feed_id: i64,
    error_message: &str,
    auto_deactivate_threshold: i64,
) -> Result<(), sqlx::Error> {
    const MAX_ERROR_LEN: usize = 500;
    let truncated: String = error_message.chars().take(MAX_ERROR_LEN).collect();

    sqlx::query(
        "UPDATE feeds SET
            fetch_error = ?,
            fetch_error_count = fetch_error_count + 1,
            consecutive_failures = consecutive_failures + 1,
            last_fetch_at = datetime('now'),
            is_active = CASE
                WHEN consecutive_failures + 1 >= ? THEN 0
                ELSE is_active
            END,
            updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(truncated)
    .bind(auto_deactivate_threshold)
    .bind(feed_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Inserts a new entry or refreshes title/content/summary/url of an
/// existing one in a single atomic statement — `ON CONFLICT(feed_id, guid)
/// DO UPDATE ... WHERE <changed> RETURNING *` — so two concurrent
/// deliveries for the same `(feed_id, guid)` can't race a SELECT against
/// each other's INSERT. `first_seen`/`created_at` are only ever set in the
/// VALUES clause, never touched by the conflict branch. A feed entry with
/// no `published_at` of its own defaults to the moment it's first seen,
/// but only on insert — a refresh never overwrites an existing timestamp.
pub async fn upsert_entry(pool: &SqlitePool, new_entry: &NewEntry) -> Result<UpsertOutcome, sqlx::Error> {
    let row: Option<Entry> = sqlx::query_as(
        "INSERT INTO entries
            (feed_id, guid, url, title, author, content, summary, published_at, updated_at, first_seen, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, COALESCE(?, datetime('now')), datetime('now'), datetime('now'), datetime('now'))
         ON CONFLICT(feed_id, guid) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            summary = excluded.summary,
            url = excluded.url,
            updated_at = datetime('now')
         WHERE entries.title IS NOT excluded.title
            OR entries.content IS NOT excluded.content
            OR entries.summary IS NOT excluded.summary
            OR entries.url IS NOT excluded.url
         RETURNING *",
    )
    .bind(new_entry.feed_id)
    .bind(&new_entry.guid)
    .bind(&new_entry.url)
    .bind(&new_entry.title)
    .bind(&new_entry.author)
    .bind(&new_entry.content)
    .bind(&new_entry.summary)
    .bind(new_entry.published_at)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(entry) => UpsertOutcome::Upserted(entry),
        None => UpsertOutcome::Unchanged,
    })
}

/// Entries published within the last `days`, newest first, for the home
/// page's display window.
pub async fn recent_entries_within(
    pool: &SqlitePool,
    days: i64,
) -> Result<Vec<(Entry, String)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntryFeedRow>(
        "SELECT e.*, f.title AS feed_title FROM entries e
         JOIN feeds f ON f.id = e.feed_id
         WHERE e.published_at >= datetime('now', ? || ' days')
         ORDER BY e.published_at DESC",
    )
    .bind(format!("-{days}"))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(EntryFeedRow::into_pair).collect())
}

/// The `limit` most recent entries globally, used both as the fallback when
/// the display window is empty and as the syndication feed body.
pub async fn most_recent_entries(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<(Entry, String)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntryFeedRow>(
        "SELECT e.*, f.title AS feed_title FROM entries e
         JOIN feeds f ON f.id = e.feed_id
         ORDER BY e.published_at DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(EntryFeedRow::into_pair).collect())
}

#[derive(sqlx::FromRow)]
struct EntryFeedRow {
    #[sqlx(flatten)]
    entry: Entry,
    feed_title: String,
}

impl EntryFeedRow {
    fn into_pair(self) -> (Entry, String) {
        (self.entry, self.feed_title)
    }
}

pub async fn hydrate_entries(
    pool: &SqlitePool,
    entry_ids: &[i64],
) -> Result<Vec<(Entry, String)>, sqlx::Error> {
    let mut out = Vec::with_capacity(entry_ids.len());
    for id in entry_ids {
        let row: Option<EntryFeedRow> = sqlx::query_as(
            "SELECT e.*, f.title AS feed_title FROM entries e
             JOIN feeds f ON f.id = e.feed_id
             WHERE e.id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        if let Some(row) = row {
            out.push(row.into_pair());
        }
    }
    Ok(out)
}

/// The deletion set for the retention sweep: entries past the retention
/// window, unioned with entries beyond the per-feed cap, oldest first so a
/// caller enforcing a global floor trims the newest candidates away first.
/// Evaluated in bounded batches via `limit`.
pub async fn retention_candidates(
    pool: &SqlitePool,
    retention_days: i64,
    max_per_feed: i64,
    batch_size: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    let ids: Vec<(i64,)> = sqlx::query_as(
        "WITH candidates AS (
            SELECT id FROM entries WHERE published_at < datetime('now', ? || ' days')
            UNION
            SELECT id FROM (
               SELECT id, ROW_NUMBER() OVER (PARTITION BY feed_id ORDER BY published_at DESC) AS rn
               FROM entries
            ) ranked WHERE rn > ?
         )
         SELECT e.id FROM entries e
         JOIN candidates c ON c.id = e.id
         ORDER BY e.published_at ASC
         LIMIT ?",
    )
    .bind(format!("-{retention_days}"))
    .bind(max_per_feed)
    .bind(batch_size)
    .fetch_all(pool)
    .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// Total entry count, used to enforce the retention sweep's global floor
/// (`config.fallback_entries`) before any candidate batch is deleted.
pub async fn count_entries(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn delete_entries(pool: &SqlitePool, entry_ids: &[i64]) -> Result<(), sqlx::Error> {
    for id in entry_ids {
        sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn record_fetch_log(
    pool: &SqlitePool,
    feed_id: i64,
    outcome: &str,
    error_type: Option<&str>,
    status_code: Option<i32>,
    retry_after: Option<&str>,
    duration_ms: i64,
    correlation_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO fetch_logs
            (feed_id, outcome, error_type, status_code, retry_after, duration_ms, correlation_id, fetched_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
    )
    .bind(feed_id)
    .bind(outcome)
    .bind(error_type)
    .bind(status_code)
    .bind(retry_after)
    .bind(duration_ms)
    .bind(correlation_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn record_dead_letter(
    pool: &SqlitePool,
    feed_id: i64,
    url: &str,
    attempt: i64,
    reason: &str,
) -> Result<DeadLetter, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO dead_letters (feed_id, url, attempt, reason, enqueued_at)
         VALUES (?, ?, ?, ?, datetime('now'))
         RETURNING *",
    )
    .bind(feed_id)
    .bind(url)
    .bind(attempt)
    .bind(reason)
    .fetch_one(pool)
    .await
}
