use std::env;

/// Process-wide configuration, loaded once at startup and threaded into
/// each operation as an explicit value (no ambient singletons).
///
/// Field names mirror the canonical environment variable keys documented
/// in the operator-facing configuration table, minus the SCREAMING_SNAKE
/// styling.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub host: String,

    /// Display window for the home page, in days.
    pub content_days: i64,
    /// Shown when the display window yields zero entries.
    pub fallback_entries: i64,
    /// Per-HTTP-call timeout (feed origin, embedding egress).
    pub http_timeout_seconds: u64,
    /// Whole-message wall-time budget for one Fetcher invocation.
    pub feed_timeout_seconds: u64,
    /// Upper bound on entries processed from a single feed body per fetch.
    pub max_entries_per_feed: usize,
    /// Steady-state per-feed truncation target enforced by retention.
    pub retention_max_per_feed: i64,
    /// Entries older than this (by `published_at`) are retention-eligible.
    pub retention_days: i64,
    /// Consecutive failures at which a feed becomes "unhealthy".
    pub feed_failure_threshold: i64,
    /// Cumulative consecutive failures at which a feed is auto-deactivated.
    pub feed_auto_deactivate_threshold: i64,
    /// Must match the Vector Store's configured index dimensionality.
    pub embedding_dimensions: usize,
    /// Endpoint the default `HttpEmbeddingService` posts to.
    pub embedding_endpoint: String,
    /// Cron expression driving the Scheduler's fan-out + retention tick.
    pub schedule: String,
    /// Max retries before a Feed Job is forwarded to the Dead Letter channel.
    pub max_retries: u32,
    /// Number of concurrent Fetcher worker tasks.
    pub fetcher_concurrency: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://planetcf.db".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            database_url,
            port,
            host,
            content_days: env_or("CONTENT_DAYS", 7),
            fallback_entries: env_or("FALLBACK_ENTRIES", 50),
            http_timeout_seconds: env_or("HTTP_TIMEOUT_SECONDS", 30),
            feed_timeout_seconds: env_or("FEED_TIMEOUT_SECONDS", 60),
            max_entries_per_feed: env_or("MAX_ENTRIES_PER_FEED", 50),
            retention_max_per_feed: env_or("RETENTION_MAX_PER_FEED", 100),
            retention_days: env_or("RETENTION_DAYS", 90),
            feed_failure_threshold: env_or("FEED_FAILURE_THRESHOLD", 3),
            feed_auto_deactivate_threshold: env_or("FEED_AUTO_DEACTIVATE_THRESHOLD", 10),
            embedding_dimensions: env_or("EMBEDDING_DIMENSIONS", 768),
            embedding_endpoint: env::var("EMBEDDING_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8081/embed".to_string()),
            schedule: env::var("SCHEDULE").unwrap_or_else(|_| "0 0 * * * *".to_string()),
            max_retries: env_or("MAX_RETRIES", 5),
            fetcher_concurrency: env_or("FETCHER_CONCURRENCY", 4),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default_on_missing_or_bad_value() {
        assert_eq!(env_or::<i64>("PLANETCF_DOES_NOT_EXIST", 90), 90);
    }
}
