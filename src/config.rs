//! Configuration schema for goatlas.
//!
//! A config file tunes what the loader extracts and which optional stages
//! (gopls, extra framework tables) run. Every field has a default, so an
//! empty file is valid.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::BodyStrategy;
use crate::atlas::{AtlasOptions, FlowOptions};
use crate::graph::DetailLevel;
use crate::oracle::GoplsOptions;

/// File names searched for, in order, when no config is given.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["goatlas.yaml", ".goatlas.yaml"];

/// Template written by `goatlas init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

/// Errors from loading or validating a config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid excluded_paths pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("oracle.command must not be empty")]
    EmptyOracleCommand,

    #[error("oracle.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("flow.custom_frameworks[{framework}]: every pattern needs a method or method_suffix")]
    EmptyCallPattern { framework: String },
}

/// Top-level config.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AtlasConfig {
    /// Drop `_test.go` files and test-only packages before analysis.
    #[serde(default)]
    pub exclude_tests: bool,
    #[serde(default)]
    pub function_body_strategy: BodyStrategy,
    /// Glob patterns (module-relative) of files to skip, e.g. "**/mocks/**".
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default)]
    pub detail_level: DetailLevel,
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Module path prefix -> framework tag, added to the built-in tables.
    #[serde(default)]
    pub frameworks: BTreeMap<String, String>,
    #[serde(default)]
    pub flow: FlowOptions,
}

impl AtlasConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse_str(content: &str) -> Result<Self, serde_yaml::Error> {
        // serde_yaml rejects an empty document for a struct
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Builder options for this config.
    pub fn to_options(&self) -> AtlasOptions {
        AtlasOptions {
            body_strategy: self.function_body_strategy,
            exclude_tests: self.exclude_tests,
            excluded_paths: self.excluded_paths.clone(),
            detail_level: self.detail_level,
            oracle: self.oracle.enabled.then(|| self.oracle.to_gopls_options()),
            frameworks: self.frameworks.clone(),
            flow: self.flow.clone(),
        }
    }
}

/// gopls oracle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    /// Whether to consult gopls (default: false)
    #[serde(default)]
    pub enabled: bool,
    /// gopls binary (default: "gopls")
    #[serde(default = "default_command")]
    pub command: String,
    /// Per-request timeout in milliseconds (default: 30000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_command() -> String {
    "gopls".to_string()
}

fn default_timeout() -> u64 {
    30_000
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_command(),
            timeout_ms: default_timeout(),
        }
    }
}

impl OracleConfig {
    pub fn to_gopls_options(&self) -> GoplsOptions {
        GoplsOptions {
            command: self.command.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Validate a config for correctness.
pub fn validate(config: &AtlasConfig) -> Result<(), ConfigError> {
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.kind().to_string(),
        })?;
    }

    if config.oracle.command.trim().is_empty() {
        return Err(ConfigError::EmptyOracleCommand);
    }
    if config.oracle.timeout_ms == 0 {
        return Err(ConfigError::ZeroTimeout);
    }

    for framework in &config.flow.custom_frameworks {
        let empty = framework.patterns.iter().any(|p| {
            p.method.as_deref().map_or(true, str::is_empty)
                && p.method_suffix.as_deref().map_or(true, str::is_empty)
        });
        if empty {
            return Err(ConfigError::EmptyCallPattern {
                framework: framework.name.clone(),
            });
        }
    }

    Ok(())
}

/// Find a config file in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
exclude_tests: true
function_body_strategy: full
excluded_paths:
  - "**/mocks/**"
detail_level: method
oracle:
  enabled: true
  timeout_ms: 5000
frameworks:
  github.com/acme/bus: acme-bus
"#;
        let config = AtlasConfig::parse_str(yaml).unwrap();
        assert!(config.exclude_tests);
        assert_eq!(config.function_body_strategy, BodyStrategy::Full);
        assert_eq!(config.detail_level, DetailLevel::Method);
        assert!(config.oracle.enabled);
        assert_eq!(config.oracle.command, "gopls");
        assert_eq!(config.oracle.timeout_ms, 5000);
        assert_eq!(config.frameworks["github.com/acme/bus"], "acme-bus");
        assert!(validate(&config).is_ok());

        let options = config.to_options();
        let gopls = options.oracle.unwrap();
        assert_eq!(gopls.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_defaults() {
        let config = AtlasConfig::parse_str("").unwrap();
        assert!(!config.exclude_tests);
        assert_eq!(config.function_body_strategy, BodyStrategy::Selective);
        assert_eq!(config.detail_level, DetailLevel::Class);
        assert!(!config.oracle.enabled);
        assert!(config.to_options().oracle.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AtlasConfig::default();
        config.excluded_paths.push("a[".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPattern { .. })));

        let mut config = AtlasConfig::default();
        config.oracle.timeout_ms = 0;
        assert!(matches!(validate(&config), Err(ConfigError::ZeroTimeout)));

        let mut config = AtlasConfig::default();
        config.oracle.command = " ".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::EmptyOracleCommand)));
    }

    #[test]
    fn test_flow_section() {
        let yaml = r#"
flow:
  protocols: [http, message]
  custom_frameworks:
    - name: acme-bus
      protocol: message
      patterns:
        - method: On
          handler_arg_index: 1
  entry_points:
    - function: pkg/worker.(*Consumer).Run
      protocol: message
"#;
        let config = AtlasConfig::parse_str(yaml).unwrap();
        assert!(validate(&config).is_ok());
        let flow = config.to_options().flow;
        assert_eq!(flow.protocols, vec!["http", "message"]);
        assert_eq!(flow.custom_frameworks[0].patterns[0].method.as_deref(), Some("On"));
        assert_eq!(flow.custom_frameworks[0].patterns[0].path_arg_index, None);
        assert_eq!(flow.entry_points[0].function, "pkg/worker.(*Consumer).Run");

        let blank = AtlasConfig::parse_str(
            "flow:\n  custom_frameworks:\n    - name: acme-bus\n      protocol: message\n      patterns:\n        - handler_arg_index: 1\n",
        )
        .unwrap();
        assert!(matches!(
            validate(&blank),
            Err(ConfigError::EmptyCallPattern { framework }) if framework == "acme-bus"
        ));
    }

    #[test]
    fn test_unknown_strategy_is_a_parse_error() {
        assert!(AtlasConfig::parse_str("function_body_strategy: some").is_err());
    }

    #[test]
    fn test_default_template_parses() {
        let config = AtlasConfig::parse_str(DEFAULT_TEMPLATE).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path()).is_none());
        fs::write(dir.path().join(".goatlas.yaml"), "exclude_tests: true\n").unwrap();
        assert_eq!(discover(dir.path()), Some(dir.path().join(".goatlas.yaml")));
        fs::write(dir.path().join("goatlas.yaml"), "").unwrap();
        assert_eq!(discover(dir.path()), Some(dir.path().join("goatlas.yaml")));
    }

    #[test]
    fn test_parse_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goatlas.yaml");
        fs::write(&path, "exclude_tests: [oops\n").unwrap();
        let err = AtlasConfig::parse_file(&path).unwrap_err();
        assert!(err.to_string().contains("goatlas.yaml"));
    }
}
