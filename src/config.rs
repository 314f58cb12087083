//! Tool configuration.
//!
//! Configuration is read from a single TOML file and handed to the engine as
//! plain data. Rule patterns and the inclusion pattern are validated and
//! compiled once, up front, by [`AppConfig::compile`].
//!
//! # Configuration File Format
//!
//! ```toml
//! dir = "/media/kindle"
//! subdirs = ["documents"]
//! locale = "en-US"
//! include_pattern = '\.(azw|mobi|txt|pdf)$'
//! include_hidden = false
//! kindle_version = 2
//! base_json = ""
//!
//! [[collections]]
//! name = "Physics"
//! patterns = ["(?i)physics", "(?i)feynman"]
//!
//! [[collections]]
//! name = "Unsorted"
//! patterns = [{ else = true }]
//! ```

use crate::collection_rules::{CollectionRule, RuleSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The only firmware generation whose collection format is supported.
pub const SUPPORTED_KINDLE_VERSION: u32 = 2;

/// Errors that can occur during configuration loading and compilation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
    /// A collection rule pattern failed to compile.
    #[error("Invalid regex pattern '{pattern}' in collection '{rule}': {reason}")]
    InvalidRegexPattern {
        rule: String,
        pattern: String,
        reason: String,
    },
    /// The file inclusion pattern failed to compile.
    #[error("Invalid include pattern '{pattern}': {reason}")]
    InvalidIncludePattern { pattern: String, reason: String },
    #[error("Only kindle version 2 is supported (got {0})")]
    UnsupportedKindleVersion(u32),
}

/// Configuration as read from disk or built from defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the mounted device.
    pub dir: PathBuf,
    /// Subdirectories of `dir` that are scanned for documents.
    pub subdirs: Vec<String>,
    /// Locale suffix appended to collection labels.
    pub locale: String,
    /// Regex a relative path must match to be considered a document.
    pub include_pattern: String,
    /// Whether to scan entries whose name starts with ".".
    pub include_hidden: bool,
    pub kindle_version: u32,
    /// Existing `collections.json` to use as the base mapping. Empty for none.
    pub base_json: String,
    /// Ordered collection rules.
    pub collections: Vec<CollectionRule>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            subdirs: vec!["documents".to_string()],
            locale: "en-US".to_string(),
            include_pattern: r"\.(azw|mobi|txt|pdf)$".to_string(),
            include_hidden: false,
            kindle_version: SUPPORTED_KINDLE_VERSION,
            base_json: String::new(),
            collections: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.kindle_collections.toml` in the current directory
    /// 3. Look for `~/.config/kindle_collections/config.toml`
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".kindle_collections.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("kindle_collections")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Renders the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Path of the base mapping, if one is configured.
    pub fn base_json_path(&self) -> Option<&Path> {
        if self.base_json.trim().is_empty() {
            None
        } else {
            Some(Path::new(&self.base_json))
        }
    }

    /// Location of the device's collection index under `dir`.
    pub fn collections_json_path(&self) -> PathBuf {
        collections_json_path(&self.dir)
    }

    /// Validates the configuration and compiles its patterns.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported kindle version or for any pattern
    /// that is not a valid regular expression.
    pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
        if self.kindle_version != SUPPORTED_KINDLE_VERSION {
            return Err(ConfigError::UnsupportedKindleVersion(self.kindle_version));
        }

        let include = Regex::new(&self.include_pattern).map_err(|e| {
            ConfigError::InvalidIncludePattern {
                pattern: self.include_pattern.clone(),
                reason: e.to_string(),
            }
        })?;
        let rules = RuleSet::compile(&self.collections)?;

        Ok(CompiledConfig {
            include,
            rules,
            locale: self.locale.clone(),
        })
    }
}

/// Validated configuration ready for scanning and classification.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub include: Regex,
    pub rules: RuleSet,
    pub locale: String,
}

/// `<dir>/system/collections.json`.
pub fn collections_json_path(dir: &Path) -> PathBuf {
    dir.join("system").join("collections.json")
}
