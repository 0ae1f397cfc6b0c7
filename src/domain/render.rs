//! Renderer: on-demand, read-only assembly of the home page and the
//! syndication/OPML outputs. Performs no writes — correctness here is
//! entirely a function of what's already in the stores.

use crate::config::Config;
use crate::domain::models::{Entry, Feed};
use crate::infrastructure::{repository, syndication};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

pub struct HomePage {
    pub site_title: String,
    /// Newest first, grouped by local calendar date.
    pub days: Vec<(NaiveDate, Vec<(Entry, String)>)>,
    pub feeds: Vec<Feed>,
    pub used_fallback: bool,
}

/// Groups the display window's entries by local date, newest first. Falls
/// back to the `fallback_entries` most recent entries globally when the
/// window is empty — the same floor retention never deletes below.
pub async fn render_home(pool: &SqlitePool, config: &Config) -> Result<HomePage, sqlx::Error> {
    let windowed = repository::recent_entries_within(pool, config.content_days).await?;
    let (entries, used_fallback) = if windowed.is_empty() {
        (
            repository::most_recent_entries(pool, config.fallback_entries).await?,
            true,
        )
    } else {
        (windowed, false)
    };

    let feeds = repository::list_active_feeds(pool).await?;

    let mut grouped: BTreeMap<NaiveDate, Vec<(Entry, String)>> = BTreeMap::new();
    for (entry, feed_title) in entries {
        let date = entry
            .published_at
            .unwrap_or(entry.first_seen)
            .date_naive();
        grouped.entry(date).or_default().push((entry, feed_title));
    }

    let mut days: Vec<_> = grouped.into_iter().collect();
    days.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(HomePage {
        site_title: "Planet CF".to_string(),
        days,
        feeds,
        used_fallback,
    })
}

pub async fn render_atom(
    pool: &SqlitePool,
    site_url: &str,
    limit: i64,
    generated_at: DateTime<Utc>,
) -> Result<String, sqlx::Error> {
    let entries = repository::most_recent_entries(pool, limit).await?;
    Ok(syndication::render_atom(
        "Planet CF",
        site_url,
        &entries,
        generated_at,
    ))
}

pub async fn render_rss(
    pool: &SqlitePool,
    site_url: &str,
    limit: i64,
    generated_at: DateTime<Utc>,
) -> Result<String, sqlx::Error> {
    let entries = repository::most_recent_entries(pool, limit).await?;
    Ok(syndication::render_rss(
        "Planet CF",
        site_url,
        &entries,
        generated_at,
    ))
}

pub async fn render_opml(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let feeds = repository::list_active_feeds(pool).await?;
    Ok(syndication::render_opml("Planet CF", &feeds))
}
