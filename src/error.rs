use std::fmt;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Failure while building a page, such as a template that no longer renders.
///
/// Platform failures are normally turned into notices by the handlers; only
/// what cannot be shown to the visitor ends up here.
pub struct AppError(anyhow::Error);

const FAILURE_PAGE: &str = r#"<div class="notice notice-error">Something went wrong, please try again.</div>"#;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Html(FAILURE_PAGE)).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
