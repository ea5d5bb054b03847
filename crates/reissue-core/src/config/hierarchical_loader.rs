//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into the library)
//! 2. Runtime config (~/.reissue/reissue-runtime.yaml)
//! 3. Environment variables (REISSUE_* prefix)
//! 4. Builder overrides (handled by caller)

use crate::error::{Error, Result};
use crate::types::RuntimeConfig;
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const RUNTIME_DEFAULTS: &str = "runtime-defaults.yaml";
const RUNTIME_FILE: &str = "reissue-runtime.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a new hierarchical config loader rooted at ~/.reissue
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the standard config directory (~/.reissue)
    fn get_config_dir() -> Result<Utf8PathBuf> {
        let home = get_home_dir()?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|p| Error::invalid_config(format!("Non UTF-8 home directory: {}", p.display())))?;

        let config_dir = home.join(".reissue");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        Ok(config_dir)
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = Self::load_embedded_config::<RuntimeConfig>(RUNTIME_DEFAULTS)?;

        let runtime_config_path = self.config_dir.join(RUNTIME_FILE);
        if runtime_config_path.exists() {
            let file_values = self.load_yaml_file::<Value>(&runtime_config_path)?;
            config = Self::merge_runtime_config(config, file_values)?;
            debug!(path = %runtime_config_path, "runtime config file applied");
        }

        self.apply_env_overrides(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Merge file values over a base config, key by key.
    ///
    /// Keys the file leaves out keep the base value.
    fn merge_runtime_config(base: RuntimeConfig, overlay: Value) -> Result<RuntimeConfig> {
        let mut merged = serde_yaml_ng::to_value(base)?;
        merge_values(&mut merged, overlay);
        Ok(serde_yaml_ng::from_value(merged)?)
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(&self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Some(val) = non_blank_env("REISSUE_ALERT_BUTTON_KEY")? {
            config.alert.button_label_key = val;
        }

        if let Some(val) = non_blank_env("REISSUE_ALERT_BUTTON_LABEL")? {
            config.alert.button_label_default = val;
        }

        if let Some(val) = non_blank_env("REISSUE_MAIN_CONTEXT")? {
            config.dispatch.main_context = val;
        }

        if let Some(val) = non_blank_env("REISSUE_LOG_OPERATION")? {
            config.logging.operation = val;
        }

        if let Some(val) = non_blank_env("REISSUE_LOG_LEVEL")? {
            config.logging.level = val;
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

/// Recursively overlay `overlay` onto `base`; null leaves the base untouched
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (slot, value) => *slot = value,
    }
}

/// Read an environment override, rejecting values that are set but blank
fn non_blank_env(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(val) if val.trim().is_empty() => {
            Err(Error::invalid_config(format!("{} must not be blank", name)))
        }
        Ok(val) => {
            debug!(variable = name, "environment override applied");
            Ok(Some(val))
        }
        Err(_) => Ok(None),
    }
}
