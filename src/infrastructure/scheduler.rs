//! Scheduler: one cron tick drives both responsibilities from spec §4.5 —
//! fan-out (one Feed Job per active feed) and the retention sweep. Grounded
//! on the teacher's `start_scheduler`, generalized from a fixed 5-minute
//! interval to the configured cron expression and from "fetch inline" to
//! "publish onto the Queue", since fetching is now the worker pool's job.

use crate::config::Config;
use crate::domain::retention;
use crate::infrastructure::queue::{FeedJob, Queue};
use crate::infrastructure::repository;
use crate::infrastructure::vector_store::VectorStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

pub async fn start(
    pool: SqlitePool,
    queue: Arc<dyn Queue>,
    vector_store: Arc<dyn VectorStore>,
    config: Config,
) -> Result<JobScheduler, Box<dyn std::error::Error>> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(config.schedule.as_str(), move |_uuid, _lock| {
        let pool = pool.clone();
        let queue = queue.clone();
        let vector_store = vector_store.clone();
        let config = config.clone();
        Box::pin(async move {
            fan_out(&pool, &queue).await;

            match retention::sweep(&pool, &vector_store, &config).await {
                Ok(report) => {
                    tracing::info!(deleted = report.deleted, "retention sweep complete");
                }
                Err(e) => tracing::error!("retention sweep failed: {e}"),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!("scheduler started");

    Ok(scheduler)
}

async fn fan_out(pool: &SqlitePool, queue: &Arc<dyn Queue>) {
    let feeds = match repository::list_active_feeds(pool).await {
        Ok(feeds) => feeds,
        Err(e) => {
            tracing::error!("failed to list active feeds for fan-out: {e}");
            return;
        }
    };

    for feed in feeds {
        queue.publish(FeedJob::new(feed.id, feed.url)).await;
    }
}
