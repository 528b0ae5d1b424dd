//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! artifact files (JSON)
//!     → loader.rs (read & parse, one uniform procedure)
//!     → store.rs (ArcSwap snapshot per artifact + health flags)
//!     → shared via Arc to the dispatcher
//!
//! In watch mode:
//!     watcher.rs detects a file change
//!     → loader.rs loads the new artifact
//!     → atomic swap of that artifact's snapshot
//!     → requests observe the new value; failures flag health instead
//! ```
//!
//! # Design Decisions
//! - Artifacts are immutable once loaded; a change swaps the whole value
//! - All settings fields have defaults so a minimal config loads
//! - Requests read snapshots only; the watcher task owns reloading

pub mod loader;
pub mod schema;
pub mod store;
pub mod watcher;

pub use loader::{ConfigError, Loader};
pub use schema::{ActionDefinition, ArtifactKind, AssetMap, RouteNode, Settings};
pub use store::{ConfigStore, RouteSet};
pub use watcher::ArtifactWatcher;
