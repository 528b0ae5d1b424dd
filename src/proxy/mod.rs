//! Data acquisition for actions.
//!
//! # Responsibilities
//! - API mode: forward the request to the upstream URL, relaying method,
//!   cookies, and a `request-host` header, with the body re-encoded per
//!   its content type
//! - Fixture mode: read a static JSON file from the data directory
//! - Relay selected upstream response headers (`set-cookie`,
//!   `content-type`, `content-disposition`) alongside the body
//!
//! # Design Decisions
//! - A non-2xx upstream status is not an error here; the body is
//!   returned with its status and the dispatcher decides what it means
//! - Multipart file parts are spooled to temp files and always cleaned
//!   up after the upstream call resolves; cleanup failure is logged,
//!   never raised
//! - The upstream timeout is per-request configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::{header, Method, Request};
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::config::schema::ActionDefinition;

/// Error type for data acquisition.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream request failed: {0}")]
    Upstream(reqwest::Error),

    #[error("fixture {path:?} not found")]
    FixtureNotFound { path: PathBuf },

    #[error("failed to read fixture {path:?}: {source}")]
    FixtureIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read request body: {0}")]
    BadRequestBody(String),
}

/// Selected headers relayed from the upstream response.
#[derive(Debug, Clone, Default)]
pub struct RelayedHeaders {
    pub set_cookie: Vec<String>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// Result of data acquisition.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Upstream status; fixture and empty modes report 200.
    pub status: u16,
    pub headers: RelayedHeaders,
    pub body: Bytes,
    /// True when the body came from an upstream API call.
    pub from_upstream: bool,
}

/// The inbound request's forwardable parts.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub host: Option<String>,
    pub cookie: Option<String>,
    pub query: Option<String>,
    pub body: BodyPayload,
}

/// Inbound body, decoded for forwarding.
#[derive(Debug)]
pub enum BodyPayload {
    None,
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
    /// Multipart fields; file parts live in temp files until the
    /// upstream call resolves.
    Multipart(Vec<FormPart>),
}

#[derive(Debug)]
pub struct FormPart {
    pub name: String,
    pub data: PartData,
}

#[derive(Debug)]
pub enum PartData {
    Text(String),
    File { path: PathBuf, file_name: String },
}

impl BodyPayload {
    fn temp_files(&self) -> Vec<PathBuf> {
        match self {
            BodyPayload::Multipart(parts) => parts
                .iter()
                .filter_map(|part| match &part.data {
                    PartData::File { path, .. } => Some(path.clone()),
                    PartData::Text(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Decode an inbound request body for forwarding.
///
/// Methods without bodies yield [`BodyPayload::None`]. A urlencoded body
/// is buffered and split into fields; any other body-carrying content
/// type is parsed as multipart form data.
pub async fn read_body(req: Request<Body>, max_bytes: usize) -> Result<BodyPayload, ProxyError> {
    let method = req.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return Ok(BodyPayload::None);
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let bytes = axum::body::to_bytes(req.into_body(), max_bytes)
            .await
            .map_err(|e| ProxyError::BadRequestBody(e.to_string()))?;
        let fields = url::form_urlencoded::parse(&bytes)
            .into_owned()
            .collect();
        return Ok(BodyPayload::Form(fields));
    }

    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| ProxyError::BadRequestBody(e.to_string()))?;

    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProxyError::BadRequestBody(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ProxyError::BadRequestBody(e.to_string()))?;
                let path = std::env::temp_dir().join(format!("bff-part-{}", Uuid::new_v4()));
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|e| ProxyError::BadRequestBody(e.to_string()))?;
                parts.push(FormPart {
                    name,
                    data: PartData::File { path, file_name },
                });
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ProxyError::BadRequestBody(e.to_string()))?;
                parts.push(FormPart {
                    name,
                    data: PartData::Text(text),
                });
            }
        }
    }
    Ok(BodyPayload::Multipart(parts))
}

/// Executes actions: upstream proxy, fixture read, or empty JSON.
pub struct DataProxy {
    client: reqwest::Client,
    data_dir: PathBuf,
}

impl DataProxy {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            data_dir: data_dir.into(),
        }
    }

    /// Fetch the payload for a bound action definition.
    pub async fn fetch(
        &self,
        def: &ActionDefinition,
        ctx: RequestContext,
        timeout: Duration,
    ) -> Result<FetchOutcome, ProxyError> {
        if let Some(api) = &def.api {
            let temp_files = ctx.body.temp_files();
            let result = self.fetch_upstream(api, ctx, timeout).await;
            cleanup_temp_files(&temp_files).await;
            return result;
        }

        if let Some(json) = &def.json {
            return self.read_fixture(json).await;
        }

        Ok(FetchOutcome {
            status: 200,
            headers: RelayedHeaders::default(),
            body: Bytes::from_static(b"{}"),
            from_upstream: false,
        })
    }

    async fn fetch_upstream(
        &self,
        api: &str,
        ctx: RequestContext,
        timeout: Duration,
    ) -> Result<FetchOutcome, ProxyError> {
        let url = match &ctx.query {
            Some(query) => format!("{api}?{query}"),
            None => api.to_string(),
        };

        let mut request = self
            .client
            .request(ctx.method.clone(), url.as_str())
            .timeout(timeout)
            .header(
                header::USER_AGENT,
                concat!("bff-dispatcher/", env!("CARGO_PKG_VERSION")),
            );

        if let Some(cookie) = &ctx.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        if let Some(host) = &ctx.host {
            request = request.header("request-host", host);
        }

        request = match ctx.body {
            BodyPayload::None => request,
            BodyPayload::Form(fields) => request.form(&fields),
            BodyPayload::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    form = match part.data {
                        PartData::Text(value) => form.text(part.name, value),
                        PartData::File { path, file_name } => {
                            let bytes = tokio::fs::read(&path)
                                .await
                                .map_err(|e| ProxyError::BadRequestBody(e.to_string()))?;
                            form.part(
                                part.name,
                                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
                            )
                        }
                    };
                }
                request.multipart(form)
            }
        };

        let response = request.send().await.map_err(classify_upstream_error)?;

        let status = response.status().as_u16();
        let headers = RelayedHeaders {
            set_cookie: response
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok().map(str::to_string))
                .collect(),
            content_type: header_string(response.headers(), header::CONTENT_TYPE),
            content_disposition: header_string(response.headers(), header::CONTENT_DISPOSITION),
        };
        let body = response.bytes().await.map_err(classify_upstream_error)?;

        Ok(FetchOutcome {
            status,
            headers,
            body,
            from_upstream: true,
        })
    }

    async fn read_fixture(&self, json: &str) -> Result<FetchOutcome, ProxyError> {
        let path = self.data_dir.join(json);
        let body = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProxyError::FixtureNotFound { path: path.clone() }
            } else {
                ProxyError::FixtureIo {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        Ok(FetchOutcome {
            status: 200,
            headers: RelayedHeaders::default(),
            body: Bytes::from(body),
            from_upstream: false,
        })
    }
}

fn classify_upstream_error(err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::UpstreamTimeout
    } else {
        ProxyError::Upstream(err)
    }
}

fn header_string(headers: &reqwest::header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn cleanup_temp_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = ?path, error = %e, "Failed to delete uploaded temp file");
        }
    }
}

/// Data directory for fixtures, under the work directory.
pub fn data_dir(workdir: &Path) -> PathBuf {
    workdir.join("datas")
}
