use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A subscription source. `url` is unique only among active records — see
/// `idx_feeds_url_active` — so a deactivated feed's URL can be reused.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub site_url: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub fetch_error: Option<String>,
    pub fetch_error_count: i64,
    pub consecutive_failures: i64,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_entry_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One syndicated item, keyed naturally by `(feed_id, guid)`.
///
/// `first_seen` is the wall-clock time this system first observed the
/// entry and is never overwritten after insert — this is what defeats a
/// spam feed that back-dates `published_at` to push old content to the top.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Entry {
    pub id: i64,
    pub feed_id: i64,
    pub guid: String,
    pub url: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub first_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An entry paired with its parent feed's title, for rendering contexts
/// that need both without a second round-trip per row.
#[derive(Debug, Clone, Serialize)]
pub struct EntryWithFeed {
    pub entry: Entry,
    pub feed_title: String,
}

/// A normalized entry ready for upsert, produced by the Feed Parser +
/// Fetcher (GUID selection, sanitization, summary truncation already done).
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub feed_id: i64,
    pub guid: String,
    pub url: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Result of one upsert attempt. The atomic `INSERT ... ON CONFLICT DO
/// UPDATE ... WHERE <changed>` statement behind this can't distinguish a
/// fresh insert from a refresh without a second round trip, and nothing
/// downstream needs that distinction — only whether a row exists to embed.
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    Upserted(Entry),
    Unchanged,
}

impl UpsertOutcome {
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            UpsertOutcome::Upserted(e) => Some(e),
            UpsertOutcome::Unchanged => None,
        }
    }
}

/// One Fetcher invocation's wide event, persisted to `fetch_logs` and
/// mirrored to `tracing` at the call site.
#[derive(Debug, Clone)]
pub struct FetchLogEntry {
    pub feed_id: i64,
    pub outcome: &'static str,
    pub error_type: Option<&'static str>,
    pub status_code: Option<i32>,
    pub retry_after: Option<String>,
    pub duration_ms: i64,
    pub correlation_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeadLetter {
    pub id: i64,
    pub feed_id: i64,
    pub url: String,
    pub attempt: i64,
    pub reason: String,
    pub enqueued_at: DateTime<Utc>,
}

/// A search hit: the hydrated entry plus its vector-similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub score: f32,
    pub feed_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_outcome_entry_is_none_when_unchanged() {
        assert!(UpsertOutcome::Unchanged.entry().is_none());
    }
}
