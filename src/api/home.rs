use crate::api::error::AppError;
use crate::api::AppState;
use crate::domain::render;
use crate::web::templates::HomeTemplate;
use askama::Template;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};

pub async fn index(State(state): State<AppState>) -> Result<Response, AppError> {
    let page = render::render_home(&state.pool, &state.config).await?;

    let template = HomeTemplate {
        site_title: page.site_title,
        days: page.days,
        feeds: page.feeds,
        used_fallback: page.used_fallback,
        feed_failure_threshold: state.config.feed_failure_threshold,
    };

    let body = template
        .render()
        .map_err(|e| AppError(axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=60",
            ),
        ],
        Html(body),
    )
        .into_response())
}
