//! Error recovery cascade.
//!
//! Selects an error status, then renders the most specific error page
//! available: `errors/<status>.ect` when it exists on disk, otherwise
//! `errors/default.ect`, otherwise a bare plain-text body. The cascade
//! never fails — its final fallback cannot error.

use std::path::Path;

use axum::http::{header, StatusCode};
use axum::response::Response;

use crate::dispatch::error::DispatchError;
use crate::dispatch::response;
use crate::render::{HelperContext, Renderer};

/// Turn a dispatch error into an error response.
pub fn recover(
    err: &DispatchError,
    renderer: &dyn Renderer,
    view_root: &Path,
    ctx: &HelperContext,
    flash: Option<&serde_json::Value>,
    flash_clear: Option<&str>,
) -> Response {
    let status = err.status();
    tracing::error!(status, error = %err, action = %ctx.action, "Dispatch failed");

    let specific = format!("errors/{status}.ect");
    let template = if view_root.join(&specific).is_file() {
        specific
    } else {
        "errors/default.ect".to_string()
    };

    let mut payload = serde_json::json!({
        "statusCode": status,
        "err": err.to_string(),
    });
    if let DispatchError::UpstreamStatus { body, .. } = err {
        if let Ok(text) = std::str::from_utf8(body) {
            payload["upstream_body"] = serde_json::Value::String(text.to_string());
        }
    }
    if let Some(flash) = flash {
        payload["flash"] = flash.clone();
    }

    match renderer.render(&template, &payload, ctx) {
        Ok(html) => {
            let mut builder = Response::builder()
                .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8");
            if let Some(clear) = flash_clear {
                builder = builder.header(header::SET_COOKIE, clear);
            }
            response::with_body(builder, html)
        }
        Err(render_err) => {
            tracing::error!(template = %template, error = %render_err, "Error page render failed");
            response::plain_text(status, &format!("{status} Error"))
        }
    }
}
