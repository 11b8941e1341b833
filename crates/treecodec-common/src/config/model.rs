use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use treecodec_core::CodecOptions;

/// Root configuration from treecodec.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TreecodecConfig {
    /// Engine settings
    #[serde(default)]
    pub codec: CodecOptions,

    /// Type library locations
    #[serde(default)]
    pub library: LibrarySection,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingSection,
}

/// [library] section
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LibrarySection {
    /// Library files or directories, relative to the config file
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// [logging] section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
