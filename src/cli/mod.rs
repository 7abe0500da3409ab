//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by main.rs.
//! Each handler returns the process exit code on success; an `Err` means the
//! run could not start at all.

mod resolve;
mod update;

pub use resolve::run_resolve;
pub use update::run_update;

// Re-export config types used by handlers
pub use crate::config::{ResolveConfig, UpdateConfig};

use crate::config::{AppConfig, Validatable};
use crate::model::{ComponentRequest, SnapshotSpec};
use crate::registry::{AuthStore, ManifestResolver, OrasClient, RetryPolicy, ToolRunner};
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Reject invalid configuration before any work starts.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
    bail!("invalid configuration:\n  {}", details.join("\n  "))
}

/// Load and fully validate the snapshot spec.
fn load_requests(path: &Path) -> Result<Vec<ComponentRequest>> {
    let spec = SnapshotSpec::load(path)?;
    let requests = spec
        .validate()
        .with_context(|| format!("invalid snapshot spec {}", path.display()))?;
    tracing::info!("Loaded {} component(s) from {}", requests.len(), path.display());
    Ok(requests)
}

fn load_store(config: &AppConfig) -> Result<Arc<AuthStore>> {
    let path = config.auth.resolved_file();
    let store = AuthStore::load(&path)?;
    tracing::debug!("Loaded {} credential entries from {}", store.len(), path.display());
    Ok(Arc::new(store))
}

fn tool_runner(config: &AppConfig) -> ToolRunner {
    ToolRunner::new(
        config.subprocess.timeout(),
        RetryPolicy {
            max_retries: config.subprocess.max_retries,
            backoff: config.subprocess.retry_backoff(),
        },
    )
}

fn build_resolver(config: &AppConfig, store: Arc<AuthStore>) -> ManifestResolver<OrasClient> {
    let oras = OrasClient::new(&config.tools.oras, tool_runner(config), store)
        .with_require_auth(config.auth.require);
    ManifestResolver::new(oras).with_max_depth(config.manifest.max_index_depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_config_reports_all_fields() {
        let mut config = AppConfig::default();
        config.subprocess.timeout_secs = 0;
        config.manifest.max_index_depth = 0;

        let err = validate_config(&config).expect_err("invalid");
        let message = err.to_string();
        assert!(message.contains("subprocess.timeout_secs"), "{message}");
        assert!(message.contains("manifest.max_index_depth"), "{message}");
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_tool_runner_follows_config() {
        let mut config = AppConfig::default();
        config.subprocess.max_retries = 5;
        let runner = tool_runner(&config);
        assert_eq!(runner.retry_policy().max_retries, 5);
        assert_eq!(runner.timeout(), config.subprocess.timeout());
    }

    #[tokio::test]
    async fn test_run_update_fails_fast_on_invalid_snapshot() {
        let dir = tempfile::tempdir().expect("temp dir");
        let snapshot = dir.path().join("snapshot.json");
        std::fs::write(
            &snapshot,
            r#"{"components": [{"containerImage": "quay.io/a:latest", "rh-registry-repo": "r.io/a"}]}"#,
        )
        .expect("write");

        let result = run_update(UpdateConfig {
            snapshot_path: snapshot,
            output_dir: dir.path().join("out"),
            report_file: None,
            app: AppConfig::default(),
        })
        .await;

        assert!(result.is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_run_update_requires_credential_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let snapshot = dir.path().join("snapshot.json");
        std::fs::write(&snapshot, r#"{"components": []}"#).expect("write");

        let mut app = AppConfig::default();
        app.auth.file = Some(dir.path().join("missing-auth.json"));
        let result = run_update(UpdateConfig {
            snapshot_path: snapshot,
            output_dir: dir.path().join("out"),
            report_file: None,
            app,
        })
        .await;

        let err = result.expect_err("missing credential store");
        assert!(format!("{err:#}").contains("missing-auth.json"), "{err:#}");
    }
}
