//! Configuration types for component-sbom runs.

use super::defaults;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Application configuration loaded from a config file and CLI flags.
///
/// Every section has defaults, so an empty file (or no file at all) is a
/// valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// External tool locations
    pub tools: ToolsConfig,
    /// Timeouts and retries for external tool invocations
    pub subprocess: SubprocessConfig,
    /// Registry credential store settings
    pub auth: AuthConfig,
    /// Manifest resolution settings
    pub manifest: ManifestConfig,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer CLI overrides on top of this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref path) = overrides.auth_file {
            self.auth.file = Some(path.clone());
        }
        if overrides.allow_anonymous {
            self.auth.require = false;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.subprocess.timeout_secs = timeout;
        }
        if let Some(retries) = overrides.max_retries {
            self.subprocess.max_retries = retries;
        }
        if let Some(ref oras) = overrides.oras {
            self.tools.oras = oras.clone();
        }
        if let Some(ref cosign) = overrides.cosign {
            self.tools.cosign = cosign.clone();
        }
    }
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub auth_file: Option<PathBuf>,
    pub allow_anonymous: bool,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub oras: Option<PathBuf>,
    pub cosign: Option<PathBuf>,
}

// ============================================================================
// Sections
// ============================================================================

/// Paths of the external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ToolsConfig {
    /// Manifest fetch tool
    pub oras: PathBuf,
    /// SBOM download tool
    pub cosign: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            oras: PathBuf::from(defaults::DEFAULT_ORAS),
            cosign: PathBuf::from(defaults::DEFAULT_COSIGN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SubprocessConfig {
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds, doubled per retry
    pub retry_backoff_ms: u64,
}

impl Default for SubprocessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::DEFAULT_TIMEOUT_SECS,
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            retry_backoff_ms: defaults::DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl SubprocessConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AuthConfig {
    /// Credential store path (defaults to ~/.docker/config.json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Fail a unit when no credential covers its reference
    pub require: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            file: None,
            require: true,
        }
    }
}

impl AuthConfig {
    /// The configured store path, falling back to the docker default.
    #[must_use]
    pub fn resolved_file(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(defaults::default_auth_file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ManifestConfig {
    /// How many levels of nested indexes are followed
    pub max_index_depth: usize,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            max_index_depth: defaults::DEFAULT_MAX_INDEX_DEPTH,
        }
    }
}

// ============================================================================
// Command Configurations
// ============================================================================

/// Everything the `update` command needs.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Snapshot spec JSON
    pub snapshot_path: PathBuf,
    /// Directory receiving one rewritten SBOM per digest
    pub output_dir: PathBuf,
    /// Optional JSON run report
    pub report_file: Option<PathBuf>,
    pub app: AppConfig,
}

/// Everything the `resolve` command needs.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    pub snapshot_path: PathBuf,
    /// Where to print the resolved snapshot (stdout when absent)
    pub output_file: Option<PathBuf>,
    pub app: AppConfig,
}
