//! Artifact loading from disk.
//!
//! One uniform procedure covers all four artifacts: read the backing
//! file, parse it into its typed form, and hand the result to the store.
//! Callers decide what a failure means (fatal at startup, degraded
//! health under watch mode).

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::schema::{ArtifactKind, AssetMap, RouteNode, Settings};

/// Error type for artifact loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("run mode {mode:?} not present in {path}")]
    MissingRunMode { mode: String, path: PathBuf },
}

/// A freshly parsed artifact, ready to be swapped into the store.
#[derive(Debug, Clone)]
pub enum LoadedArtifact {
    Settings(Settings),
    Routes(RouteNode),
    Actions(serde_json::Value),
    Assets(AssetMap),
}

/// Loads artifacts for one work directory and run mode.
#[derive(Debug, Clone)]
pub struct Loader {
    workdir: PathBuf,
    run_mode: String,
}

impl Loader {
    pub fn new(workdir: impl Into<PathBuf>, run_mode: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            run_mode: run_mode.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn run_mode(&self) -> &str {
        &self.run_mode
    }

    /// Load and parse one artifact from its backing file.
    pub fn load(&self, kind: ArtifactKind) -> Result<LoadedArtifact, ConfigError> {
        let path = kind.path(&self.workdir);
        match kind {
            ArtifactKind::Settings => {
                let sections: serde_json::Value = read_json(&path)?;
                let section = sections
                    .get(&self.run_mode)
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingRunMode {
                        mode: self.run_mode.clone(),
                        path: path.clone(),
                    })?;
                let settings = serde_json::from_value(section)
                    .map_err(|source| ConfigError::Parse { path, source })?;
                Ok(LoadedArtifact::Settings(settings))
            }
            ArtifactKind::Routes => Ok(LoadedArtifact::Routes(read_json(&path)?)),
            ArtifactKind::Actions => Ok(LoadedArtifact::Actions(read_json(&path)?)),
            ArtifactKind::Assets => Ok(LoadedArtifact::Assets(read_json(&path)?)),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_workdir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn loads_run_mode_section() {
        let dir = write_workdir(&[(
            "launchpack.json",
            r#"{"local": {"watch": true}, "production": {"watch": false}}"#,
        )]);
        let loader = Loader::new(dir.path(), "local");

        let LoadedArtifact::Settings(settings) = loader.load(ArtifactKind::Settings).unwrap()
        else {
            panic!("expected settings");
        };
        assert!(settings.watch);
    }

    #[test]
    fn missing_run_mode_is_an_error() {
        let dir = write_workdir(&[("launchpack.json", r#"{"local": {}}"#)]);
        let loader = Loader::new(dir.path(), "staging");

        let err = loader.load(ArtifactKind::Settings).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRunMode { .. }));
    }

    #[test]
    fn malformed_routes_report_parse_error() {
        let dir = write_workdir(&[("config/routing.json", "{not json")]);
        let loader = Loader::new(dir.path(), "local");

        let err = loader.load(ArtifactKind::Routes).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Loader::new(dir.path(), "local");

        let err = loader.load(ArtifactKind::Actions).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
