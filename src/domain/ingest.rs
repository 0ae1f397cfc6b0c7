//! Fetcher Worker orchestration: drives one Feed Job through conditional
//! fetch, parse, sanitize, upsert, embed, and feed-health bookkeeping.
//! `infrastructure::fetcher` owns the HTTP leg; this module owns everything
//! the spec's §4.4 steps 4-10 describe.

use crate::config::Config;
use crate::domain::models::NewEntry;
use crate::infrastructure::embedding::{embedding_input, EmbeddingService};
use crate::infrastructure::feed_parser::{self, RawEntry};
use crate::infrastructure::fetcher::{FetchError, FetchResult, Fetcher};
use crate::infrastructure::queue::{Delivery, FeedJob, InProcessQueue, Queue};
use crate::infrastructure::sanitizer;
use crate::infrastructure::vector_store::VectorStore;
use crate::infrastructure::{fetcher, repository};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SUMMARY_TRUNCATE_CHARS: usize = 500;

pub enum Outcome {
    /// Terminal: acknowledge the message, no retry.
    Done,
    /// Retryable failure; caller decides the not-before time.
    Retry { reason: String },
    /// `429` with an explicit or defaulted not-before time.
    RateLimited { not_before: DateTime<Utc> },
}

pub struct IngestContext {
    pub pool: SqlitePool,
    pub fetcher: Arc<Fetcher>,
    pub vector_store: Arc<dyn VectorStore>,
    pub embedding_service: Arc<dyn EmbeddingService>,
    pub config: Config,
}

/// Runs one Feed Job to completion or to a retryable/rate-limited outcome.
/// Bounded by `config.feed_timeout_seconds` for the whole invocation —
/// exceeding it counts as a retryable failure for this message only.
pub async fn process_job(ctx: &IngestContext, job: &FeedJob) -> Outcome {
    let budget = Duration::from_secs(ctx.config.feed_timeout_seconds);
    match tokio::time::timeout(budget, process_job_inner(ctx, job)).await {
        Ok(outcome) => outcome,
        Err(_) => Outcome::Retry {
            reason: "feed_timeout_seconds exceeded".to_string(),
        },
    }
}

async fn process_job_inner(ctx: &IngestContext, job: &FeedJob) -> Outcome {
    let started = Instant::now();

    let feed = match repository::get_feed(&ctx.pool, job.feed_id).await {
        Ok(Some(feed)) => feed,
        Ok(None) => return Outcome::Done,
        Err(e) => {
            return Outcome::Retry {
                reason: format!("repository error loading feed: {e}"),
            }
        }
    };

    let fetch_result = ctx
        .fetcher
        .fetch(&job.url, feed.etag.as_deref(), feed.last_modified.as_deref())
        .await;

    let duration_ms = started.elapsed().as_millis() as i64;

    let fetch_result = match fetch_result {
        Ok(result) => result,
        Err(err) => {
            return handle_fetch_error(ctx, job, &feed.url, err, duration_ms).await;
        }
    };

    match fetch_result {
        FetchResult::NotModified {
            final_url,
            permanent_redirect,
        } => {
            if permanent_redirect && final_url != feed.url {
                let _ = repository::rewrite_feed_url(&ctx.pool, feed.id, &final_url).await;
            }
            let _ = repository::record_fetch_success(&ctx.pool, feed.id, None, None, None).await;
            log_outcome(ctx, job, "not_modified", None, None, duration_ms).await;
            Outcome::Done
        }
        FetchResult::RateLimited { retry_after } => {
            let fetcher::RetryAfter::At(not_before) = retry_after.unwrap_or_else(|| {
                fetcher::RetryAfter::At(fetcher::default_backoff())
            });
            log_outcome(ctx, job, "rate_limited", Some("429"), None, duration_ms).await;
            Outcome::RateLimited { not_before }
        }
        FetchResult::Updated {
            final_url,
            body,
            etag,
            last_modified,
            permanent_redirect,
        } => {
            handle_updated(
                ctx,
                job,
                &feed,
                final_url,
                body,
                etag,
                last_modified,
                permanent_redirect,
                duration_ms,
            )
            .await
        }
    }
}

async fn handle_fetch_error(
    ctx: &IngestContext,
    job: &FeedJob,
    _feed_url: &str,
    err: FetchError,
    duration_ms: i64,
) -> Outcome {
    let retryable = err.is_retryable();
    let error_type = err.error_type();

    log_outcome(ctx, job, "error", Some(error_type), None, duration_ms).await;

    if !retryable {
        // URL will never become safe by retrying: record the failure and
        // acknowledge, per spec §4.4 step 1.
        let _ = repository::record_fetch_failure(
            &ctx.pool,
            job.feed_id,
            &err.to_string(),
            ctx.config.feed_auto_deactivate_threshold,
        )
        .await;
        return Outcome::Done;
    }

    let _ = repository::record_fetch_failure(
        &ctx.pool,
        job.feed_id,
        &err.to_string(),
        ctx.config.feed_auto_deactivate_threshold,
    )
    .await;

    Outcome::Retry {
        reason: err.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_updated(
    ctx: &IngestContext,
    job: &FeedJob,
    feed: &crate::domain::models::Feed,
    final_url: String,
    body: Vec<u8>,
    etag: Option<String>,
    last_modified: Option<String>,
    permanent_redirect: bool,
    duration_ms: i64,
) -> Outcome {
    let parsed = match feed_parser::parse(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            log_outcome(ctx, job, "error", Some("parse_error"), None, duration_ms).await;
            let _ = repository::record_fetch_failure(
                &ctx.pool,
                job.feed_id,
                &e.to_string(),
                ctx.config.feed_auto_deactivate_threshold,
            )
            .await;
            return Outcome::Retry {
                reason: e.to_string(),
            };
        }
    };

    if parsed.entries.is_empty() {
        log_outcome(ctx, job, "error", Some("empty_feed"), None, duration_ms).await;
        let _ = repository::record_fetch_failure(
            &ctx.pool,
            job.feed_id,
            "parsed feed yielded zero entries",
            ctx.config.feed_auto_deactivate_threshold,
        )
        .await;
        return Outcome::Retry {
            reason: "zero entries".to_string(),
        };
    }

    if permanent_redirect && final_url != feed.url {
        let _ = repository::rewrite_feed_url(&ctx.pool, feed.id, &final_url).await;
    }

    let mut max_published: Option<DateTime<Utc>> = feed.last_entry_at;

    for raw in parsed
        .entries
        .into_iter()
        .take(ctx.config.max_entries_per_feed)
    {
        let Some(new_entry) = normalize_entry(feed.id, raw) else {
            continue;
        };

        if let Some(published) = new_entry.published_at {
            max_published = Some(max_published.map_or(published, |cur| cur.max(published)));
        }

        match repository::upsert_entry(&ctx.pool, &new_entry).await {
            Ok(outcome) => {
                if let Some(entry) = outcome.entry() {
                    embed_and_index(ctx, entry).await;
                }
            }
            Err(e) => {
                tracing::warn!(
                    correlation_id = %job.correlation_id,
                    feed_id = feed.id,
                    "entry upsert failed: {e}"
                );
            }
        }
    }

    let _ = repository::record_fetch_success(
        &ctx.pool,
        feed.id,
        etag.as_deref(),
        last_modified.as_deref(),
        max_published,
    )
    .await;

    log_outcome(ctx, job, "success", None, None, duration_ms).await;
    Outcome::Done
}

fn normalize_entry(feed_id: i64, raw: RawEntry) -> Option<NewEntry> {
    let guid = raw
        .guid_candidate
        .filter(|s| !s.is_empty())
        .or_else(|| raw.link.clone())
        .or_else(|| raw.title.clone())?;

    let published_at = raw.published.or(raw.updated);

    let content = raw.content_html.as_deref().map(sanitizer::sanitize);
    let summary = raw
        .summary
        .as_deref()
        .map(|s| s.chars().take(SUMMARY_TRUNCATE_CHARS).collect::<String>());

    Some(NewEntry {
        feed_id,
        guid,
        url: raw.link,
        title: raw.title.unwrap_or_else(|| "Untitled".to_string()),
        author: raw.author,
        content,
        summary,
        published_at,
    })
}

async fn embed_and_index(ctx: &IngestContext, entry: &crate::domain::models::Entry) {
    let input = embedding_input(&entry.title, entry.content.as_deref());
    match ctx.embedding_service.embed(&input).await {
        Ok(vector) => {
            let title_prefix: String = entry.title.chars().take(80).collect();
            if let Err(e) = ctx
                .vector_store
                .upsert(entry.id, &vector, &title_prefix)
                .await
            {
                tracing::warn!(entry_id = entry.id, "vector upsert failed: {e}");
            }
        }
        Err(e) => {
            tracing::warn!(entry_id = entry.id, "embedding request failed: {e}");
        }
    }
}

async fn log_outcome(
    ctx: &IngestContext,
    job: &FeedJob,
    outcome: &str,
    error_type: Option<&str>,
    status_code: Option<i32>,
    duration_ms: i64,
) {
    tracing::info!(
        correlation_id = %job.correlation_id,
        feed_id = job.feed_id,
        outcome,
        error_type,
        duration_ms,
        "fetch outcome"
    );
    let _ = repository::record_fetch_log(
        &ctx.pool,
        job.feed_id,
        outcome,
        error_type,
        status_code,
        None,
        duration_ms,
        &job.correlation_id,
    )
    .await;
}

/// One consumer task: pulls deliveries off the queue until it closes,
/// processing each to completion before asking for the next. Several of
/// these run concurrently (`fetcher_concurrency`) as the horizontal
/// fan-out proxy described in spec §5.
pub async fn run_worker(ctx: Arc<IngestContext>, queue: Arc<InProcessQueue>) {
    loop {
        match queue.next().await {
            None => return,
            Some(Delivery::Job(job)) => {
                let outcome = process_job(ctx.as_ref(), &job).await;
                match outcome {
                    Outcome::Done => {}
                    Outcome::Retry { reason } => {
                        let not_before = Utc::now() + chrono::Duration::seconds(30);
                        queue.retry(job, not_before, &reason).await;
                    }
                    Outcome::RateLimited { not_before } => {
                        queue.retry(job, not_before, "rate_limited").await;
                    }
                }
            }
            Some(Delivery::DeadLettered { job, reason }) => {
                if let Err(e) = repository::record_dead_letter(
                    &ctx.pool,
                    job.feed_id,
                    &job.url,
                    job.attempt as i64,
                    &reason,
                )
                .await
                {
                    tracing::error!(feed_id = job.feed_id, "failed to record dead letter: {e}");
                }
            }
        }
    }
}
