//! Runtime configuration types
//!
//! These types control the ambient behavior of the retry orchestrator:
//! how the alert button is labelled, which execution context owns the UI,
//! and how logging is set up.

use serde::{Deserialize, Serialize};

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Alert presentation settings
    #[serde(default)]
    pub alert: AlertConfig,

    /// Execution context settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Alert presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AlertConfig {
    /// Localization key for the dismiss button
    #[serde(default = "default_button_label_key")]
    pub button_label_key: String,

    /// Fallback label when the key has no translation
    #[serde(default = "default_button_label")]
    pub button_label_default: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            button_label_key: default_button_label_key(),
            button_label_default: default_button_label(),
        }
    }
}

fn default_button_label_key() -> String {
    "alert.dismiss".to_string()
}
fn default_button_label() -> String {
    "OK".to_string()
}

/// Execution context settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchConfig {
    /// Name of the primary UI-owning context
    #[serde(default = "default_main_context")]
    pub main_context: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            main_context: default_main_context(),
        }
    }
}

fn default_main_context() -> String {
    "main".to_string()
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Operation label attached to orchestrator log lines
    #[serde(default = "default_operation")]
    pub operation: String,

    /// `EnvFilter` directive, e.g. `info` or `reissue_batch=debug`
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            operation: default_operation(),
            level: default_level(),
        }
    }
}

fn default_operation() -> String {
    "batch-retry".to_string()
}
fn default_level() -> String {
    "info".to_string()
}
