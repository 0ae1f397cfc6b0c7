use chrono::Utc;
use planetcf::domain::models::{NewEntry, UpsertOutcome};
use planetcf::infrastructure::{database, repository};
use pretty_assertions::assert_eq;
use sqlx::SqlitePool;

async fn test_pool() -> SqlitePool {
    let pool = database::setup_database("sqlite::memory:")
        .await
        .expect("in-memory database should always open");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("migrations should apply cleanly to a fresh database");
    pool
}

async fn seed_feed(pool: &SqlitePool, url: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO feeds (url, title, is_active, created_at, updated_at)
         VALUES (?, 'Test Feed', 1, datetime('now'), datetime('now'))
         RETURNING id",
    )
    .bind(url)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

fn new_entry(feed_id: i64, guid: &str, title: &str) -> NewEntry {
    NewEntry {
        feed_id,
        guid: guid.to_string(),
        url: Some(format!("https://example.com/{guid}")),
        title: title.to_string(),
        author: None,
        content: Some("<p>content</p>".to_string()),
        summary: Some("summary".to_string()),
        published_at: Some(Utc::now()),
    }
}

#[tokio::test]
async fn first_seen_is_set_once_and_survives_refetch() {
    let pool = test_pool().await;
    let feed_id = seed_feed(&pool, "https://example.com/feed.xml").await;

    let inserted = repository::upsert_entry(&pool, &new_entry(feed_id, "e1", "Original title"))
        .await
        .unwrap();
    let first_seen = match inserted {
        UpsertOutcome::Upserted(entry) => entry.first_seen,
        UpsertOutcome::Unchanged => panic!("expected an insert on first sighting"),
    };

    let mut refetch = new_entry(feed_id, "e1", "Updated title");
    refetch.content = Some("<p>new content</p>".to_string());
    let refreshed = repository::upsert_entry(&pool, &refetch).await.unwrap();

    match refreshed {
        UpsertOutcome::Upserted(entry) => {
            assert_eq!(entry.title, "Updated title");
            assert_eq!(entry.first_seen, first_seen);
        }
        UpsertOutcome::Unchanged => panic!("expected an upsert when content changed"),
    }
}

#[tokio::test]
async fn concurrent_first_sighting_upserts_do_not_error_or_duplicate() {
    let pool = test_pool().await;
    let feed_id = seed_feed(&pool, "https://example.com/feed.xml").await;
    let entry_a = new_entry(feed_id, "race", "Racing entry");
    let entry_b = entry_a.clone();

    let (a, b) = tokio::join!(
        repository::upsert_entry(&pool, &entry_a),
        repository::upsert_entry(&pool, &entry_b),
    );

    assert!(a.is_ok(), "first concurrent upsert should not error: {a:?}");
    assert!(b.is_ok(), "second concurrent upsert should not error: {b:?}");

    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM entries WHERE feed_id = ? AND guid = 'race'",
    )
    .bind(feed_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count.0, 1, "no duplicate row from the race");
}

#[tokio::test]
async fn missing_published_at_defaults_to_now_on_insert_only() {
    let pool = test_pool().await;
    let feed_id = seed_feed(&pool, "https://example.com/feed.xml").await;
    let mut entry = new_entry(feed_id, "e1", "No date in feed");
    entry.published_at = None;

    let before = Utc::now() - chrono::Duration::seconds(5);
    let outcome = repository::upsert_entry(&pool, &entry).await.unwrap();
    let inserted = match outcome {
        UpsertOutcome::Upserted(entry) => entry,
        UpsertOutcome::Unchanged => panic!("expected an insert"),
    };
    assert!(
        inserted.published_at.unwrap() >= before,
        "published_at should default to the current wall-clock time"
    );
}

#[tokio::test]
async fn idempotent_refetch_with_no_changes_is_unchanged() {
    let pool = test_pool().await;
    let feed_id = seed_feed(&pool, "https://example.com/feed.xml").await;
    let entry = new_entry(feed_id, "e1", "Stable title");

    repository::upsert_entry(&pool, &entry).await.unwrap();
    let second = repository::upsert_entry(&pool, &entry).await.unwrap();

    assert!(matches!(second, UpsertOutcome::Unchanged));
}

#[tokio::test]
async fn feed_url_unique_only_among_active_feeds() {
    let pool = test_pool().await;
    let url = "https://example.com/feed.xml";
    let first = seed_feed(&pool, url).await;

    sqlx::query("UPDATE feeds SET is_active = 0 WHERE id = ?")
        .bind(first)
        .execute(&pool)
        .await
        .unwrap();

    // Reusing the URL after deactivation must not violate the partial
    // unique index.
    let second = seed_feed(&pool, url).await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn retention_sweep_deletes_entries_beyond_per_feed_cap() {
    let pool = test_pool().await;
    let feed_id = seed_feed(&pool, "https://example.com/feed.xml").await;

    for i in 0..5 {
        let mut entry = new_entry(feed_id, &format!("e{i}"), &format!("Entry {i}"));
        entry.published_at = Some(Utc::now() - chrono::Duration::days(i));
        repository::upsert_entry(&pool, &entry).await.unwrap();
    }

    let candidates = repository::retention_candidates(&pool, 90, 2, 500)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 3, "5 entries capped to 2 leaves 3 candidates");

    repository::delete_entries(&pool, &candidates).await.unwrap();

    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries WHERE feed_id = ?")
        .bind(feed_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining.0, 2);
}

#[tokio::test]
async fn record_fetch_success_resets_failure_counters() {
    let pool = test_pool().await;
    let feed_id = seed_feed(&pool, "https://example.com/feed.xml").await;

    repository::record_fetch_failure(&pool, feed_id, "boom", 10)
        .await
        .unwrap();
    repository::record_fetch_success(&pool, feed_id, Some("\"abc\""), None, None)
        .await
        .unwrap();

    let feed = repository::get_feed(&pool, feed_id).await.unwrap().unwrap();
    assert_eq!(feed.consecutive_failures, 0);
    assert!(feed.fetch_error.is_none());
    assert_eq!(feed.etag.as_deref(), Some("\"abc\""));
}

#[tokio::test]
async fn auto_deactivates_after_failure_threshold() {
    let pool = test_pool().await;
    let feed_id = seed_feed(&pool, "https://example.com/feed.xml").await;

    for _ in 0..3 {
        repository::record_fetch_failure(&pool, feed_id, "boom", 3)
            .await
            .unwrap();
    }

    let feed = repository::get_feed(&pool, feed_id).await.unwrap().unwrap();
    assert_eq!(feed.consecutive_failures, 3);
    assert!(!feed.is_active);
}
