use crate::web::templates::ErrorTemplate;
use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

pub struct AppError(pub StatusCode, pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let template = ErrorTemplate {
            status: self.0.as_u16(),
            message: self.1,
        };
        match template.render() {
            Ok(body) => (self.0, Html(body)).into_response(),
            Err(_) => (self.0, "internal error rendering error page").into_response(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("database error: {err}");
        AppError(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    }
}

impl From<crate::domain::search::SearchError> for AppError {
    fn from(err: crate::domain::search::SearchError) -> Self {
        tracing::error!("search error: {err}");
        AppError(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    }
}
