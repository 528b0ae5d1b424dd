//! Live configuration store.
//!
//! # Responsibilities
//! - Hold the current snapshot of each artifact behind an `ArcSwap`
//! - Swap whole artifacts on reload so readers never see a partial update
//! - Track per-artifact load health for the watch-mode degraded state
//!
//! # Design Decisions
//! - One `ArcSwap` per artifact: a routing reload does not disturb a
//!   request that is reading the action map
//! - The inverse route map is rebuilt once per routes reload and stored
//!   in the same snapshot as the tree
//! - Readers take `Arc` snapshots; no locks anywhere in the request path

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::config::loader::{ConfigError, LoadedArtifact, Loader};
use crate::config::schema::{ArtifactKind, AssetMap, RouteNode, Settings};
use crate::routing;

/// Route tree plus its precomputed inversion.
#[derive(Debug, Clone)]
pub struct RouteSet {
    pub tree: RouteNode,
    /// Action identifier → canonical URL template.
    pub inverse: BTreeMap<String, String>,
}

impl RouteSet {
    pub fn new(tree: RouteNode) -> Self {
        let inverse = routing::invert(&tree);
        Self { tree, inverse }
    }

    fn empty() -> Self {
        Self::new(RouteNode::Branch(BTreeMap::new()))
    }
}

/// Owner of the four configuration artifacts.
pub struct ConfigStore {
    loader: Loader,
    settings: ArcSwap<Settings>,
    routes: ArcSwap<RouteSet>,
    actions: ArcSwap<serde_json::Value>,
    assets: ArcSwap<AssetMap>,
    health: DashMap<ArtifactKind, bool>,
}

impl ConfigStore {
    pub fn new(loader: Loader) -> Self {
        let health = DashMap::new();
        for kind in ArtifactKind::ALL {
            health.insert(kind, true);
        }
        Self {
            loader,
            settings: ArcSwap::from_pointee(Settings::default()),
            routes: ArcSwap::from_pointee(RouteSet::empty()),
            actions: ArcSwap::from_pointee(serde_json::Value::Object(Default::default())),
            assets: ArcSwap::from_pointee(AssetMap::new()),
            health,
        }
    }

    /// Initial load of all four artifacts.
    ///
    /// Settings failures are always fatal (the watch flag lives there).
    /// Required artifacts are fatal outside watch mode and degrade to an
    /// unhealthy flag inside it. The optional asset map falls back to
    /// empty with a warning.
    pub fn bootstrap(&self) -> Result<(), ConfigError> {
        self.apply(self.loader.load(ArtifactKind::Settings)?);
        let watch = self.settings().watch;

        for kind in [ArtifactKind::Routes, ArtifactKind::Actions] {
            match self.loader.load(kind) {
                Ok(artifact) => self.apply(artifact),
                Err(err) if watch => {
                    tracing::error!(artifact = %kind, error = %err, "Artifact failed to load; serving degraded until it heals");
                    self.health.insert(kind, false);
                }
                Err(err) => return Err(err),
            }
        }

        if let Err(err) = self.loader.load(ArtifactKind::Assets).map(|a| self.apply(a)) {
            tracing::warn!(error = %err, "Asset map unavailable; continuing without it");
        }

        Ok(())
    }

    /// Reload one artifact, updating its health flag.
    ///
    /// Returns `true` when the new snapshot was swapped in. On failure
    /// the previous snapshot stays current; a required artifact is
    /// flagged unhealthy so the dispatcher fails requests fast.
    pub fn reload(&self, kind: ArtifactKind) -> bool {
        match self.loader.load(kind) {
            Ok(artifact) => {
                self.apply(artifact);
                self.health.insert(kind, true);
                if kind.required() {
                    tracing::info!(artifact = %kind, "Artifact reloaded");
                } else {
                    tracing::debug!(artifact = %kind, "Artifact reloaded");
                }
                true
            }
            Err(err) => {
                if kind.required() {
                    self.health.insert(kind, false);
                    tracing::error!(artifact = %kind, error = %err, "Artifact reload failed; refusing requests until it heals");
                } else {
                    tracing::warn!(artifact = %kind, error = %err, "Artifact reload failed; keeping previous snapshot");
                }
                false
            }
        }
    }

    fn apply(&self, artifact: LoadedArtifact) {
        match artifact {
            LoadedArtifact::Settings(settings) => self.settings.store(Arc::new(settings)),
            LoadedArtifact::Routes(tree) => self.routes.store(Arc::new(RouteSet::new(tree))),
            LoadedArtifact::Actions(actions) => self.actions.store(Arc::new(actions)),
            LoadedArtifact::Assets(assets) => self.assets.store(Arc::new(assets)),
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    pub fn routes(&self) -> Arc<RouteSet> {
        self.routes.load_full()
    }

    pub fn actions(&self) -> Arc<serde_json::Value> {
        self.actions.load_full()
    }

    pub fn assets(&self) -> Arc<AssetMap> {
        self.assets.load_full()
    }

    pub fn workdir(&self) -> &Path {
        self.loader.workdir()
    }

    /// All required artifacts healthy?
    pub fn is_healthy(&self) -> bool {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| kind.required())
            .all(|kind| self.health.get(&kind).map(|h| *h).unwrap_or(false))
    }

    /// Required artifacts currently flagged unhealthy.
    pub fn unhealthy_artifacts(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| kind.required())
            .filter(|kind| !self.health.get(kind).map(|h| *h).unwrap_or(false))
            .collect()
    }
}
