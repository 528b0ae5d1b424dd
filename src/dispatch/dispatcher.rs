//! Per-request orchestration.
//!
//! # Data Flow
//! ```text
//! Request
//!     → route resolution (action identifier + params)
//!     → action lookup + bind (private copy, params substituted)
//!     → data acquisition (upstream / fixture / empty)
//!     → interpret payload: redirect | render | passthrough
//!     → on any failure: recovery cascade
//! ```
//!
//! # Design Decisions
//! - Every fallible phase returns `Result`; one central branch feeds
//!   failures into the recovery cascade
//! - All shared state is read as immutable snapshots taken at the top
//!   of the request; a mid-flight reload cannot tear them
//! - Redirect responses never reach the renderer

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::action;
use crate::config::schema::Settings;
use crate::config::store::{ConfigStore, RouteSet};
use crate::dispatch::error::DispatchError;
use crate::dispatch::{recovery, response};
use crate::observability::access_log::AccessLogEntry;
use crate::proxy::{self, DataProxy, RelayedHeaders, RequestContext};
use crate::render::{self, HelperContext, Renderer};
use crate::routing;

/// Payload status codes that trigger a redirect.
const REDIRECT_CODES: [u16; 4] = [301, 302, 303, 307];

/// The per-request orchestrator.
pub struct Dispatcher {
    store: Arc<ConfigStore>,
    proxy: DataProxy,
    renderer: Arc<dyn Renderer>,
    view_root: PathBuf,
}

/// Forwardable parts of the inbound request, captured before the body
/// is consumed.
struct Inbound {
    method: Method,
    host: Option<String>,
    cookie: Option<String>,
    query: Option<String>,
}

impl Dispatcher {
    pub fn new(store: Arc<ConfigStore>, renderer: Arc<dyn Renderer>) -> Self {
        let workdir = store.workdir();
        Self {
            proxy: DataProxy::new(proxy::data_dir(workdir)),
            view_root: workdir.join("views"),
            store,
            renderer,
        }
    }

    /// Dispatch one request. Never panics and never returns an error:
    /// failures become error pages through the recovery cascade.
    pub async fn dispatch(&self, req: Request<Body>, log: &mut AccessLogEntry) -> Response {
        if !self.store.is_healthy() {
            tracing::error!(
                artifacts = ?self.store.unhealthy_artifacts(),
                "Refusing request: configuration unhealthy"
            );
            return response::plain_text(500, "500 Internal Server Error");
        }

        let settings = self.store.settings();
        let routes = self.store.routes();
        let actions = self.store.actions();

        let inbound = Inbound {
            method: req.method().clone(),
            host: header_string(&req, header::HOST),
            cookie: header_string(&req, header::COOKIE),
            query: req.uri().query().map(str::to_string),
        };
        let request_url = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        let resolved = routing::resolve(&routes.tree, req.uri().path());
        log.action = Some(resolved.action.clone());

        // Captures arrive percent-encoded; decode them once, up front.
        let Some(params) = decode_params(&resolved.params) else {
            return response::plain_text(400, "Bad Request");
        };

        // The flash cookie is consumed here and attached only by the
        // paths that actually render.
        let (flash, flash_clear) = render::take_flash(inbound.cookie.as_deref());

        let ctx = HelperContext {
            action: resolved.action.clone(),
            params: params.clone(),
            url_map: routes.inverse.clone(),
            settings_extra: settings.extra.clone(),
            host: inbound.host.clone(),
            request_url,
        };

        let result = self
            .run(
                req,
                &resolved.action,
                &params,
                &inbound,
                &settings,
                &routes,
                &actions,
                &ctx,
                flash.as_ref(),
                flash_clear.as_deref(),
                log,
            )
            .await;

        match result {
            Ok(response) => response,
            Err(err) => recovery::recover(
                &err,
                self.renderer.as_ref(),
                &self.view_root,
                &ctx,
                flash.as_ref(),
                flash_clear.as_deref(),
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        req: Request<Body>,
        action_name: &str,
        params: &std::collections::BTreeMap<String, String>,
        inbound: &Inbound,
        settings: &Settings,
        routes: &RouteSet,
        actions: &Value,
        ctx: &HelperContext,
        flash: Option<&Value>,
        flash_clear: Option<&str>,
        log: &mut AccessLogEntry,
    ) -> Result<Response, DispatchError> {
        let def = action::resolve(actions, action_name, &inbound.method)?;
        let origin = action::api_origin(settings);
        let bound = action::bind(&def, params, origin.as_deref());
        log.upstream_url = bound.api.clone();

        // Only API mode consumes the inbound body; fixtures never parse it.
        let body = if bound.api.is_some() {
            proxy::read_body(req, settings.max_body_bytes).await?
        } else {
            proxy::BodyPayload::None
        };
        let outcome = self
            .proxy
            .fetch(
                &bound,
                RequestContext {
                    method: inbound.method.clone(),
                    host: inbound.host.clone(),
                    cookie: inbound.cookie.clone(),
                    query: inbound.query.clone(),
                    body,
                },
                Duration::from_secs(settings.upstream_timeout_secs),
            )
            .await?;

        // A non-2xx upstream is relayed as-is when the action has no
        // template; with one, it selects an error page instead.
        if outcome.from_upstream && !(200..300).contains(&outcome.status) {
            if bound.template.is_some() {
                return Err(DispatchError::UpstreamStatus {
                    status: outcome.status,
                    body: outcome.body,
                });
            }
            let builder = apply_relayed(
                status_builder(outcome.status),
                &outcome.headers,
                true,
            );
            return Ok(response::with_body(builder, outcome.body));
        }

        let mut payload: Value = match serde_json::from_slice(&outcome.body) {
            Ok(value) => value,
            Err(e) => {
                if bound.template.is_some() {
                    return Err(DispatchError::BadUpstreamPayload(e));
                }
                let builder = apply_relayed(
                    status_builder(bound.status_code.unwrap_or(200)),
                    &outcome.headers,
                    true,
                );
                return Ok(response::with_body(builder, outcome.body));
            }
        };

        let app_status = payload
            .get("app_status_code")
            .and_then(Value::as_u64)
            .map(|code| code as u16);

        if let Some(code) = app_status.filter(|code| REDIRECT_CODES.contains(code)) {
            return redirect(code, &payload, routes, &outcome.headers);
        }

        let status = bound.status_code.or(app_status).unwrap_or(200);

        if let Some(template) = &bound.template {
            if let (Value::Object(map), Some(flash)) = (&mut payload, flash) {
                map.insert("flash".to_string(), flash.clone());
            }
            let html = self.renderer.render(template, &payload, ctx)?;

            let mut builder = status_builder(status)
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8");
            builder = apply_relayed(builder, &outcome.headers, false);
            if let Some(clear) = flash_clear {
                builder = builder.header(header::SET_COOKIE, clear);
            }
            return Ok(response::with_body(builder, html));
        }

        let builder = apply_relayed(status_builder(status), &outcome.headers, true);
        Ok(response::with_body(builder, outcome.body))
    }
}

/// Build the redirect response: `Location` from an absolute URL or an
/// inverted action identifier, flash cookie merged with any relayed
/// `set-cookie` headers, empty body.
fn redirect(
    code: u16,
    payload: &Value,
    routes: &RouteSet,
    relayed: &RelayedHeaders,
) -> Result<Response, DispatchError> {
    let target = payload
        .get("redirect")
        .and_then(Value::as_str)
        .ok_or(DispatchError::RedirectTargetMissing)?;

    let location = if action::is_absolute_url(target) {
        target.to_string()
    } else {
        let template = routes
            .inverse
            .get(target)
            .ok_or_else(|| DispatchError::RedirectTargetNotFound(target.to_string()))?;
        routing::expand(template, &redirect_params(payload))
    };

    let mut builder = status_builder(code).header(header::LOCATION, location);
    for cookie in &relayed.set_cookie {
        builder = builder.header(header::SET_COOKIE, cookie);
    }
    if let Some(flash) = payload.get("flash") {
        builder = builder.header(header::SET_COOKIE, render::flash_cookie(flash));
    }
    Ok(response::with_body(builder, Body::empty()))
}

/// `redirect_params` values as strings; non-string scalars are
/// stringified the way templates expect them.
fn redirect_params(payload: &Value) -> std::collections::BTreeMap<String, String> {
    let mut params = std::collections::BTreeMap::new();
    if let Some(Value::Object(map)) = payload.get("redirect_params") {
        for (name, value) in map {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            params.insert(name.clone(), text);
        }
    }
    params
}

fn decode_params(
    raw: &std::collections::BTreeMap<String, String>,
) -> Option<std::collections::BTreeMap<String, String>> {
    let mut params = std::collections::BTreeMap::new();
    for (name, value) in raw {
        let decoded = percent_decode_str(value).decode_utf8().ok()?;
        params.insert(name.clone(), decoded.into_owned());
    }
    Some(params)
}

fn header_string(req: &Request<Body>, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn status_builder(status: u16) -> axum::http::response::Builder {
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
}

/// Copy relayed upstream headers onto the outbound response.
/// `content-type` participates only on passthrough paths; rendered
/// pages set their own.
fn apply_relayed(
    mut builder: axum::http::response::Builder,
    headers: &RelayedHeaders,
    include_content_type: bool,
) -> axum::http::response::Builder {
    for cookie in &headers.set_cookie {
        builder = builder.header(header::SET_COOKIE, cookie);
    }
    if let Some(disposition) = &headers.content_disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition);
    }
    if include_content_type {
        builder = builder.header(
            header::CONTENT_TYPE,
            headers
                .content_type
                .as_deref()
                .unwrap_or("application/json; charset=utf-8"),
        );
    }
    builder
}
