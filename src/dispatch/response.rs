//! Response construction helpers shared across the dispatch pipeline.

use axum::body::Body;
use axum::http::{header, response::Builder, StatusCode};
use axum::response::Response;

/// Finish a response builder, falling back to a bare 500 if the
/// accumulated parts were invalid.
pub fn with_body(builder: Builder, body: impl Into<Body>) -> Response {
    builder.body(body.into()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build response");
        plain_text(500, "500 Error")
    })
}

/// A plain-text response, used by the health surface and terminal
/// error fallbacks.
pub fn plain_text(status: u16, body: &str) -> Response {
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}
