//! Everything a command needs: merged configuration and the loaded library.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;
use tracing::debug;
use treecodec_common::{TreecodecConfig, TypeLibrary};
use treecodec_core::{Codec, TypeDescriptor};

pub struct Session {
    pub config: TreecodecConfig,
    pub library: TypeLibrary,
}

impl Session {
    /// Config from `config_path`, or discovered from the working directory.
    pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<TreecodecConfig> {
        match config_path {
            Some(path) => TreecodecConfig::load(path),
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                TreecodecConfig::discover(&cwd)
            }
        }
    }

    /// Load the configured libraries followed by `extra_libraries`.
    pub fn open(mut config: TreecodecConfig, extra_libraries: &[PathBuf]) -> anyhow::Result<Self> {
        config.library.paths.extend(extra_libraries.iter().cloned());
        let library = TypeLibrary::load(&config.library.paths)?;
        debug!(types = library.len(), "Session ready");
        Ok(Session { config, library })
    }

    pub fn resolve(&self, type_name: &str) -> anyhow::Result<TypeDescriptor> {
        self.library.resolve_str(type_name)
    }

    pub fn codec(&self) -> Codec {
        Codec::new().with_options(self.config.codec)
    }
}

/// Read a JSON document from `path`, or stdin for `None` and `-`.
pub fn read_document(path: Option<&Path>) -> anyhow::Result<Value> {
    match path {
        Some(p) if p != Path::new("-") => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read {}", p.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", p.display()))
        }
        _ => serde_json::from_reader(std::io::stdin().lock()).context("Invalid JSON on stdin"),
    }
}
