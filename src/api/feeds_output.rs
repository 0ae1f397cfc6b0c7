use crate::api::error::AppError;
use crate::api::AppState;
use crate::domain::render;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

const FEED_ENTRY_LIMIT: i64 = 50;
const CACHE_CONTROL: &str = "public, max-age=3600, stale-while-revalidate=60";

pub async fn atom(State(state): State<AppState>) -> Result<Response, AppError> {
    let site_url = format!("http://{}:{}/", state.config.host, state.config.port);
    let body = render::render_atom(&state.pool, &site_url, FEED_ENTRY_LIMIT, Utc::now()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/atom+xml; charset=utf-8"),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        body,
    )
        .into_response())
}

pub async fn rss(State(state): State<AppState>) -> Result<Response, AppError> {
    let site_url = format!("http://{}:{}/", state.config.host, state.config.port);
    let body = render::render_rss(&state.pool, &site_url, FEED_ENTRY_LIMIT, Utc::now()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        body,
    )
        .into_response())
}

pub async fn opml(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = render::render_opml(&state.pool).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/x-opml; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"feeds.opml\"",
            ),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        body,
    )
        .into_response())
}
