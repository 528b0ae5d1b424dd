//! Action lookup and binding.
//!
//! # Responsibilities
//! - Index the resource table by dotted action identifier
//! - Apply lowercase-method overrides (replace, never merge)
//! - Bind path parameters into the definition's URL templates
//! - Resolve relative upstream URLs against the configured API origin
//!
//! # Design Decisions
//! - `bind` is a pure function returning an owned definition; the
//!   canonical table is never mutated, so concurrent requests cannot
//!   observe each other's substitutions
//! - Parameters missing from the template vanish silently (placeholders
//!   are stripped, not errors) — a long-standing contract of the route
//!   tables this serves

use std::collections::BTreeMap;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{ActionDefinition, Settings};
use crate::routing::inverse::encode_segment;

/// Environment override for the API origin.
pub const API_ORIGIN_ENV: &str = "BFF_API_ORIGIN";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action {0:?} not found in the resource table")]
    NotFound(String),
}

/// Look up the definition for an action identifier and request method.
///
/// Dotted segments index successively into the resource table. A key
/// matching the lowercase method name on the final node replaces the
/// definition wholesale for that method.
pub fn resolve(
    actions: &serde_json::Value,
    action: &str,
    method: &Method,
) -> Result<ActionDefinition, ActionError> {
    let mut node = actions;
    for part in action.split('.') {
        node = node
            .get(part)
            .ok_or_else(|| ActionError::NotFound(action.to_string()))?;
    }
    if !node.is_object() {
        return Err(ActionError::NotFound(action.to_string()));
    }

    let method_key = method.as_str().to_ascii_lowercase();
    if let Some(override_node) = node.get(&method_key) {
        if override_node.is_object() {
            node = override_node;
        }
    }

    serde_json::from_value(node.clone()).map_err(|_| ActionError::NotFound(action.to_string()))
}

/// The effective API origin: environment override, then settings, then
/// the legacy base-url key.
pub fn api_origin(settings: &Settings) -> Option<String> {
    std::env::var(API_ORIGIN_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| settings.api_origin.clone())
        .or_else(|| settings.api_base_url.clone())
}

/// Bind path parameters into a definition, producing a new value.
///
/// Each `{name}` occurrence in the `api` and `json` templates is
/// replaced with the percent-encoded parameter value; unmatched
/// placeholders are stripped. A relative `api` URL is prefixed with the
/// origin.
pub fn bind(
    def: &ActionDefinition,
    params: &BTreeMap<String, String>,
    origin: Option<&str>,
) -> ActionDefinition {
    let mut bound = def.clone();

    bound.api = bound.api.map(|api| substitute(&api, params));
    bound.json = bound.json.map(|json| substitute(&json, params));

    if let (Some(api), Some(origin)) = (&bound.api, origin) {
        if !is_absolute_url(api) {
            bound.api = Some(format!("{origin}{api}"));
        }
    }

    bound
}

/// Absolute upstream/redirect URLs are used verbatim; anything else is
/// treated as relative (or, for redirects, as an action identifier).
pub fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn substitute(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut result = template.to_string();
    for (name, value) in params {
        result = result.replace(&format!("{{{name}}}"), &encode_segment(value));
    }
    strip_placeholders(&result)
}

/// Remove any `{...}` spans left after substitution.
fn strip_placeholders(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match rest.find('}') {
            Some(end) => rest = &rest[end + 1..],
            // Unclosed brace: not a placeholder, keep the tail.
            None => break,
        }
    }
    out.push_str(rest);
    out
}
