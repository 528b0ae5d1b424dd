//! Configuration schema definitions.
//!
//! Four declarative artifacts drive the dispatcher, all JSON on disk under
//! the work directory:
//!
//! - `launchpack.json` — run-mode-keyed settings ([`Settings`])
//! - `config/routing.json` — the route tree ([`RouteNode`])
//! - `config/resources.json` — the action map (kept as raw JSON, indexed
//!   by dotted action identifiers)
//! - `public/resourcesmap.json` — static-asset hash map ([`AssetMap`])

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Run-mode settings: one section of `launchpack.json`, selected by the
/// run mode the process was started with.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Bind address (e.g., "0.0.0.0:1337").
    pub bind_address: String,

    /// Origin prefixed onto relative `api` URLs.
    pub api_origin: Option<String>,

    /// Legacy key for the API origin; consulted after `api_origin`.
    pub api_base_url: Option<String>,

    /// Re-read the asset map on every request instead of using the
    /// loaded snapshot.
    pub use_resources_map: bool,

    /// Watch mode: monitor artifact files and hot-reload them instead of
    /// requiring a restart. Load failures degrade to per-request 500s
    /// rather than terminating the process.
    pub watch: bool,

    /// Upstream request timeout in seconds.
    pub upstream_timeout_secs: u64,

    /// Total inbound request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: usize,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Remaining settings keys, exposed to templates through the helper
    /// context.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:1337".to_string(),
            api_origin: None,
            api_base_url: None,
            use_resources_map: false,
            watch: false,
            upstream_timeout_secs: 30,
            request_timeout_secs: 35,
            max_body_bytes: 2 * 1024 * 1024,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A node of the route tree.
///
/// Branch keys are path segments; a key starting with `:` captures the
/// segment as a parameter, and the reserved key `#` names the index
/// action of the branch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RouteNode {
    /// Leaf: a dotted action identifier.
    Action(String),
    /// Interior node: segment key → child.
    Branch(BTreeMap<String, RouteNode>),
}

impl RouteNode {
    /// Child lookup on a branch; `None` on leaves.
    pub fn child(&self, key: &str) -> Option<&RouteNode> {
        match self {
            RouteNode::Branch(children) => children.get(key),
            RouteNode::Action(_) => None,
        }
    }
}

/// One action's fetch-and-render configuration.
///
/// Exactly one of `api` / `json` is expected; with both absent the action
/// responds with an empty JSON object. Unknown keys on the same JSON node
/// are method overrides or nested groups and are skipped here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ActionDefinition {
    /// Upstream URL template, optionally containing `{param}`
    /// placeholders; relative URLs are prefixed with the API origin.
    pub api: Option<String>,

    /// Static fixture path, relative to the `datas/` directory.
    pub json: Option<String>,

    /// View name to render; absent means the payload is returned
    /// verbatim.
    pub template: Option<String>,

    /// Fixed HTTP status override.
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
}

/// Request path → hashed filename, served from `public/hashed/`.
pub type AssetMap = HashMap<String, String>;

/// The four hot-reloadable artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Settings,
    Routes,
    Actions,
    Assets,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Settings,
        ArtifactKind::Routes,
        ArtifactKind::Actions,
        ArtifactKind::Assets,
    ];

    /// Artifact name used in logs and health reporting.
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::Settings => "settings",
            ArtifactKind::Routes => "routing",
            ArtifactKind::Actions => "resources",
            ArtifactKind::Assets => "resourcesmap",
        }
    }

    /// Backing file, relative to the work directory.
    pub fn path(self, workdir: &Path) -> PathBuf {
        match self {
            ArtifactKind::Settings => workdir.join("launchpack.json"),
            ArtifactKind::Routes => workdir.join("config").join("routing.json"),
            ArtifactKind::Actions => workdir.join("config").join("resources.json"),
            ArtifactKind::Assets => workdir.join("public").join("resourcesmap.json"),
        }
    }

    /// Required artifacts gate traffic: a broken one fails requests (or
    /// the process, outside watch mode). The asset map is optional.
    pub fn required(self) -> bool {
        !matches!(self, ArtifactKind::Assets)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
