use crate::api::error::AppError;
use crate::api::AppState;
use crate::domain::search::{self, SearchError};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

const DEFAULT_TOP_K: usize = 20;
const MIN_QUERY_LEN: usize = 2;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    results: Vec<crate::domain::models::SearchHit>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    if params.q.chars().count() < MIN_QUERY_LEN {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "q must be at least 2 characters" })),
        )
            .into_response());
    }

    let results = match search::search(
        &state.pool,
        &state.embedding_service,
        &state.vector_store,
        &params.q,
        DEFAULT_TOP_K,
    )
    .await
    {
        Ok(results) => results,
        // An empty or failing Vector Store degrades search to no results,
        // not a 500 — the home page and syndication feeds are unaffected.
        Err(SearchError::VectorStore(e)) => {
            tracing::warn!("vector store query failed, returning empty results: {e}");
            Vec::new()
        }
        Err(e) => return Err(AppError::from(e)),
    };

    Ok(Json(SearchResponse { results }).into_response())
}
