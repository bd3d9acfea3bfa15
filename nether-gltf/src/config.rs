//! Codec configuration (`nether-gltf.toml`)
//!
//! All sections are optional; missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::serialize::{DEFAULT_GENERATOR, WriteOptions};

/// Top-level codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CodecConfig {
    /// Document cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Serializer settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Document cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum resident documents (default: 5)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Serializer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Write entity names (default: true)
    #[serde(default = "default_true")]
    pub export_names: bool,
    /// `asset.generator` string (default: "nether-gltf <version>")
    #[serde(default = "default_generator")]
    pub generator: String,
    /// Create missing output directories (default: true)
    #[serde(default = "default_true")]
    pub create_directories: bool,
}

fn default_capacity() -> usize {
    5
}
fn default_true() -> bool {
    true
}
fn default_generator() -> String {
    DEFAULT_GENERATOR.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_names: default_true(),
            generator: default_generator(),
            create_directories: default_true(),
        }
    }
}

impl From<&ExportConfig> for WriteOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            export_names: config.export_names,
            generator: (!config.generator.is_empty()).then(|| config.generator.clone()),
            create_directories: config.create_directories,
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?).map_err(|e| Error::file(path, e))
    }
}
