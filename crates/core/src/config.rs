//! TOML-based configuration for MergeFlow.
//!
//! Every field has a default, and the config file itself is optional: with
//! no file present the tools operate on the current working directory with
//! remote `origin` and test branch `test`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Repository location and remote settings.
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Merge behaviour settings.
    #[serde(default)]
    pub merge: MergeConfig,

    /// MCP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Repository location and remote settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Path to the git repository the tools operate on.
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,

    /// Remote used for pull/push synchronization.
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_remote() -> String {
    "origin".into()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
            remote: default_remote(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge behaviour
// ---------------------------------------------------------------------------

/// Merge behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Target branch for `merge_to_test` when the caller does not name one.
    #[serde(default = "default_test_branch")]
    pub default_test_branch: String,
}

fn default_test_branch() -> String {
    "test".into()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_test_branch: default_test_branch(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// MCP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional log file. The server writes protocol frames on stdout, so
    /// diagnostics go to stderr or, when set, this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Load from `path` when given, fall back to defaults when the file is
    /// absent. An explicitly named file that does not exist is an error; a
    /// missing default-location file is not.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => {
                debug!("no configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Validate that all fields are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.remote.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repository.remote".into(),
                detail: "remote must not be empty".into(),
            });
        }
        if self.merge.default_test_branch.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "merge.default_test_branch".into(),
                detail: "test branch name must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Render a default configuration file with commentary, for `init`.
    pub fn default_toml() -> String {
        r#"# MergeFlow configuration.
# Every field is optional; the values below are the defaults.

[repository]
# Path to the git repository the merge tools operate on.
path = "."
# Remote used for pull/push synchronization.
remote = "origin"

[merge]
# Target branch for merge_to_test when the caller does not name one.
default_test_branch = "test"

[server]
# Minimum log level: trace, debug, info, warn, error.
log_level = "info"
# Optional log file; defaults to stderr.
# log_file = "/var/log/mergeflow.log"
"#
        .to_string()
    }
}
