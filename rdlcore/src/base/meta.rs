use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    magic::{DEFAULT_ERROR_MARKER, ENV_META_CONFIG_PATH},
    utils::error::{RdlError, RdlResult},
};

/// A custom report item plugin available on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtMetaInfo {
    pub uuid: Uuid,
    pub path: String,
    /// Type name the item is referenced by in report definitions.
    pub name: String,
}

/// Settings of the render driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Number of workers evaluating rows concurrently (at least one is used).
    pub worker_threads: usize,
    /// Text shown in place of a cell whose evaluation failed.
    pub error_marker: String,
    /// Upper bound for a single call into a custom report item, if any.
    pub extension_timeout_ms: Option<u64>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
            extension_timeout_ms: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetaInfo {
    #[serde(default)]
    pub ext: Vec<ExtMetaInfo>,
    #[serde(default)]
    pub render: RenderSettings,
}

impl EngineMetaInfo {
    /// Get the default path to the engine configuration file.
    pub fn default_path() -> PathBuf {
        // Check if the environment variable is set
        if let Ok(config_path) = std::env::var(ENV_META_CONFIG_PATH) {
            return config_path.into();
        }

        // Fallback to default paths based on OS
        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push("rdl");
        path.push("meta.toml");
        path
    }

    /// Load EngineMetaInfo from a TOML file.
    pub fn load_from_toml(path: &Path) -> RdlResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;
        Self::from_toml_str(&toml_str, &path.display().to_string())
    }

    /// Parse EngineMetaInfo from TOML text. `file` only names the source in errors.
    pub fn from_toml_str(toml_str: &str, file: &str) -> RdlResult<Self> {
        toml::from_str(toml_str).map_err(|e| RdlError::ManifestParseError {
            source: e,
            file: file.to_string(),
        })
    }

    /// Save EngineMetaInfo to a TOML file.
    pub fn save_to_toml(&self, path: &Path) -> RdlResult<()> {
        let toml_str = toml::to_string(self).map_err(|e| {
            RdlError::Unknown(format!(
                "Failed during serialization of TOML to path `{}`: {}",
                path.display(),
                e
            ))
        })?;

        // Attempt to create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Looks up a plugin entry by item type name.
    pub fn find_ext(&self, name: &str) -> Option<&ExtMetaInfo> {
        self.ext.iter().find(|ext| ext.name == name)
    }
}
