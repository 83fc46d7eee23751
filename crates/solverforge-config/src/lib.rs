//! Configuration system for the SolverForge interop bridge.
//!
//! Load bridge configuration from TOML or YAML files to control the
//! interpreter version window, which source modules are never translated
//! structurally, and logging, without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use solverforge_config::BridgeConfig;
//! use solverforge_bytecode::RuntimeVersion;
//!
//! let config = BridgeConfig::from_toml_str(r#"
//!     runtime_version = "3.10"
//!     bridge_modules = ["solverforge", "jpype"]
//!
//!     [marshalling]
//!     sync_opaque_fields = false
//! "#).unwrap();
//!
//! assert_eq!(config.runtime_version, RuntimeVersion::PY_3_10);
//! assert!(config.is_bridge_module("jpype.imports"));
//! assert!(!config.marshalling.sync_opaque_fields);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use solverforge_config::BridgeConfig;
//!
//! let config = BridgeConfig::load("bridge.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use solverforge_bytecode::{RuntimeVersion, VersionWindow};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BridgeConfig {
    /// Version of the running source interpreter.
    #[serde(default = "default_runtime_version")]
    pub runtime_version: RuntimeVersion,

    /// Interpreter versions the bytecode extractor accepts.
    #[serde(default)]
    pub supported_versions: VersionWindow,

    /// Source modules belonging to the bridge itself or its bootstrap.
    ///
    /// Classes defined in these modules are wrapped opaquely and the modules
    /// are never copied into a function's globals. An entry also covers its
    /// submodules.
    #[serde(default = "default_bridge_modules")]
    pub bridge_modules: Vec<String>,

    /// Foreign interface used when a callable is marshalled without an explicit shape.
    #[serde(default = "default_callable_interface")]
    pub default_callable_interface: String,

    /// Value marshalling configuration.
    #[serde(default)]
    pub marshalling: MarshallingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_runtime_version() -> RuntimeVersion {
    RuntimeVersion::PY_3_11
}

fn default_bridge_modules() -> Vec<String> {
    [
        "solverforge",
        "solverforge_interop",
        "jpype",
        "_jpype",
        "java",
        "typing",
        "abc",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_callable_interface() -> String {
    "PythonLikeFunction".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            runtime_version: default_runtime_version(),
            supported_versions: VersionWindow::default(),
            bridge_modules: default_bridge_modules(),
            default_callable_interface: default_callable_interface(),
            marshalling: MarshallingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the running interpreter version.
    pub fn with_runtime_version(mut self, version: RuntimeVersion) -> Self {
        self.runtime_version = version;
        self
    }

    /// Adds a bridge module to the exclusion list.
    pub fn with_bridge_module(mut self, module: impl Into<String>) -> Self {
        self.bridge_modules.push(module.into());
        self
    }

    /// Sets the default callable interface.
    pub fn with_callable_interface(mut self, interface: impl Into<String>) -> Self {
        self.default_callable_interface = interface.into();
        self
    }

    /// Returns true if `module` or one of its parent packages is a bridge module.
    ///
    /// # Examples
    ///
    /// ```
    /// use solverforge_config::BridgeConfig;
    ///
    /// let config = BridgeConfig::new();
    /// assert!(config.is_bridge_module("solverforge"));
    /// assert!(config.is_bridge_module("solverforge.api"));
    /// assert!(!config.is_bridge_module("solverforge_extra"));
    /// assert!(!config.is_bridge_module("my_domain"));
    /// ```
    pub fn is_bridge_module(&self, module: &str) -> bool {
        self.bridge_modules.iter().any(|entry| {
            module == entry
                || module
                    .strip_prefix(entry.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.supported_versions.min > self.supported_versions.max {
            return Err(ConfigError::Invalid(format!(
                "supported_versions.min {} is newer than max {}",
                self.supported_versions.min, self.supported_versions.max
            )));
        }
        if self.default_callable_interface.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_callable_interface must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Value marshalling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MarshallingConfig {
    /// Copy instance attributes into opaque wrappers when they are created.
    #[serde(default = "default_true")]
    pub sync_opaque_fields: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MarshallingConfig {
    fn default() -> Self {
        Self {
            sync_opaque_fields: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "solverforge_interop=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests;
