//! Default values for component-sbom configuration.

use std::path::PathBuf;

pub const DEFAULT_ORAS: &str = "oras";
pub const DEFAULT_COSIGN: &str = "cosign";

/// Per-attempt timeout for external tools, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

pub const DEFAULT_MAX_INDEX_DEPTH: usize = crate::registry::DEFAULT_MAX_INDEX_DEPTH;

/// Upper bound accepted for `subprocess.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// The docker credential store, `~/.docker/config.json`.
#[must_use]
pub fn default_auth_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docker")
        .join("config.json")
}
