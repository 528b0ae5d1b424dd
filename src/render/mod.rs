//! Render collaborator seam.
//!
//! The template engine itself is an external collaborator behind the
//! [`Renderer`] trait: `render(template, payload, ctx) -> html | error`.
//! This module owns everything the dispatcher must provide around that
//! seam — the helper context templates consume, and the one-shot flash
//! cookie lifecycle.
//!
//! # Design Decisions
//! - Helpers are plain methods on [`HelperContext`]; engines adapt them
//!   to their own function-binding mechanism
//! - The flash cookie is cleared the moment it is consumed and its
//!   inbound value never leaks back to the client

use std::collections::BTreeMap;
use std::path::PathBuf;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::routing;

/// One-shot flash cookie name.
pub const FLASH_COOKIE: &str = "lp-flash";

/// Cookie-value escape set (letters, digits and `-_.!~*'()` stay
/// literal).
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Error type for template rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {0:?} not found")]
    TemplateNotFound(String),

    #[error("failed to read template: {0}")]
    Io(#[from] std::io::Error),

    #[error("render failed: {0}")]
    Engine(String),
}

/// Context surfaced to templates alongside the payload.
#[derive(Debug, Clone)]
pub struct HelperContext {
    /// Action that produced this render.
    pub action: String,
    /// Captured route parameters.
    pub params: BTreeMap<String, String>,
    /// Action identifier → URL template, for the `url()` helper.
    pub url_map: BTreeMap<String, String>,
    /// Settings keys passed through for templates.
    pub settings_extra: serde_json::Map<String, serde_json::Value>,
    /// Inbound Host header.
    pub host: Option<String>,
    /// Inbound path and query.
    pub request_url: String,
}

impl HelperContext {
    /// Resolve an action identifier to a concrete URL, substituting
    /// capture slots and appending leftover parameters as a query
    /// string. Unknown actions yield an empty string.
    pub fn url(&self, action: &str, params: &BTreeMap<String, String>) -> String {
        let Some(template) = self.url_map.get(action) else {
            return String::new();
        };

        let mut used = Vec::new();
        let path = template
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => match params.get(name) {
                    Some(value) => {
                        used.push(name.to_string());
                        routing::inverse::encode_segment(value)
                    }
                    None => segment.to_string(),
                },
                None => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/");

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (name, value) in params {
            if !used.contains(name) {
                query.append_pair(name, value);
                has_query = true;
            }
        }

        if has_query {
            format!("{path}?{}", query.finish())
        } else {
            path
        }
    }

    /// Absolute URL of the current request.
    pub fn current_url(&self) -> String {
        match &self.host {
            Some(host) => format!("https://{host}{}", self.request_url),
            None => self.request_url.clone(),
        }
    }

    /// A settings value passed through to templates, if present.
    pub fn config_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.settings_extra.get(key)
    }

    /// One captured route parameter, empty string when absent.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }
}

/// The external template engine's contract.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        template: &str,
        payload: &serde_json::Value,
        ctx: &HelperContext,
    ) -> Result<String, RenderError>;
}

/// Consume the flash cookie from a request's `cookie` header.
///
/// Returns the parsed flash payload and, when the cookie was present
/// and valid, the `Set-Cookie` value that clears it. A cookie that
/// fails to parse is logged and left untouched.
pub fn take_flash(cookie_header: Option<&str>) -> (Option<serde_json::Value>, Option<String>) {
    let Some(raw) = cookie_header.and_then(find_flash_value) else {
        return (None, None);
    };
    if raw.is_empty() {
        return (None, None);
    }

    let decoded = percent_decode_str(&raw).decode_utf8_lossy();
    match serde_json::from_str(&decoded) {
        Ok(value) => (Some(value), Some(clear_flash_cookie())),
        Err(e) => {
            tracing::error!(error = %e, "Discarding unparseable flash cookie");
            (None, None)
        }
    }
}

fn find_flash_value(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name.trim() == FLASH_COOKIE).then(|| value.trim().to_string())
    })
}

/// Serialize a flash payload into a `Set-Cookie` value.
pub fn flash_cookie(value: &serde_json::Value) -> String {
    let serialized = value.to_string();
    let encoded = utf8_percent_encode(&serialized, COOKIE_VALUE);
    format!("{FLASH_COOKIE}={encoded}; Path=/")
}

fn clear_flash_cookie() -> String {
    format!("{FLASH_COOKIE}=; Max-Age=0; Path=/")
}

/// Degenerate engine: serves view files verbatim.
///
/// Stands in for the real template engine behind the seam; anything
/// implementing [`Renderer`] replaces it at wiring time.
pub struct FileRenderer {
    view_root: PathBuf,
}

impl FileRenderer {
    pub fn new(view_root: impl Into<PathBuf>) -> Self {
        Self {
            view_root: view_root.into(),
        }
    }
}

impl Renderer for FileRenderer {
    fn render(
        &self,
        template: &str,
        _payload: &serde_json::Value,
        _ctx: &HelperContext,
    ) -> Result<String, RenderError> {
        let path = self.view_root.join(template);
        if !path.is_file() {
            return Err(RenderError::TemplateNotFound(template.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }
}
