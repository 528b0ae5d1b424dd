//! Static asset delivery.
//!
//! Thin wrapper over `tower-http`'s file service: paths listed in the
//! asset hash map are served from `public/hashed/`, and paths matching
//! an existing file under `public/` are served directly with far-future
//! cache headers. Everything else falls through to the dispatcher.
//!
//! Static requests stay servable even while the routing/resource
//! artifacts are unhealthy.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use chrono::Utc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::config::schema::ArtifactKind;
use crate::config::store::ConfigStore;

/// Ten years, the far-future cache window for direct public files.
const CACHE_SECONDS: i64 = 315_360_000;

/// Serve the request from `public/` when it maps to a static asset.
///
/// Returns the request unchanged when it is not a static hit.
pub async fn try_serve(
    store: &ConfigStore,
    req: Request<Body>,
) -> Result<Response, Request<Body>> {
    let path = req.uri().path().to_string();
    if path.contains("..") {
        return Err(req);
    }

    let settings = store.settings();
    if settings.use_resources_map {
        // Pick up asset map edits eagerly; the snapshot covers failures.
        store.reload(ArtifactKind::Assets);
    }

    let public_root = store.workdir().join("public");
    let target: Option<(PathBuf, bool)> = if let Some(hashed) = store.assets().get(&path) {
        Some((public_root.join("hashed").join(hashed), false))
    } else {
        let direct = public_root.join(path.trim_start_matches('/'));
        direct.is_file().then_some((direct, true))
    };

    match target {
        Some((file, cacheable)) => Ok(serve_file(&file, req, cacheable).await),
        None => Err(req),
    }
}

async fn serve_file(path: &Path, req: Request<Body>, cacheable: bool) -> Response {
    match ServeFile::new(path).oneshot(req).await {
        Ok(served) => {
            let mut response = served.map(Body::new);
            if cacheable {
                let headers = response.headers_mut();
                headers.insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("max-age=315360000, must-revalidate"),
                );
                let expires = (Utc::now() + chrono::Duration::seconds(CACHE_SECONDS))
                    .format("%a, %d %b %Y %H:%M:%S GMT")
                    .to_string();
                if let Ok(value) = HeaderValue::from_str(&expires) {
                    headers.insert(header::EXPIRES, value);
                }
            }
            response
        }
        Err(never) => match never {},
    }
}
