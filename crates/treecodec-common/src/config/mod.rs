//! Configuration module
//!
//! Handles discovery and loading of treecodec configuration files
//! (treecodec.toml, treecodec.json).

pub mod model;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

pub use self::model::*;

/// File names searched for, in order, in each directory.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["treecodec.toml", "treecodec.json"];

/// Walk up directory tree to find treecodec.toml or treecodec.json
pub fn discover_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    None
}

impl TreecodecConfig {
    /// Load configuration from a file path
    ///
    /// Relative library paths are resolved against the file's directory.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: TreecodecConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON config {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML config {}", path.display()))?,
        };

        if let Some(base) = path.parent() {
            config.library.paths = config
                .library
                .paths
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }

        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load the config found from `start_dir`, or the defaults when there is none.
    pub fn discover(start_dir: &Path) -> crate::Result<Self> {
        match discover_config(start_dir) {
            Some(path) => Self::load(&path),
            None => {
                debug!(dir = %start_dir.display(), "No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
