//! `oras`-backed manifest fetching.

use super::{AuthStore, ManifestSource, ScopedAuthFile, ToolCommand, ToolRunner};
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Fetches manifests with `oras manifest fetch`, handing the tool a
/// credential file scoped to the reference being fetched.
#[derive(Debug, Clone)]
pub struct OrasClient {
    program: PathBuf,
    runner: ToolRunner,
    auth: Arc<AuthStore>,
    require_auth: bool,
}

impl OrasClient {
    pub fn new(program: impl Into<PathBuf>, runner: ToolRunner, auth: Arc<AuthStore>) -> Self {
        Self {
            program: program.into(),
            runner,
            auth,
            require_auth: true,
        }
    }

    /// Allow anonymous fetches for references with no stored credential.
    #[must_use]
    pub const fn with_require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    fn command(&self, auth: &ScopedAuthFile, reference: &str) -> ToolCommand {
        ToolCommand::new(&self.program)
            .args(["manifest", "fetch", "--registry-config"])
            .arg(auth.config_path())
            .arg(reference)
    }
}

impl ManifestSource for OrasClient {
    async fn fetch_manifest(&self, reference: &str) -> Result<Vec<u8>> {
        let auth = ScopedAuthFile::acquire_async(&self.auth, reference).await?;
        if let Err(err) = auth.ensure_found(self.require_auth) {
            auth.release_async().await;
            return Err(err);
        }

        let output = self.runner.run(&self.command(&auth, reference)).await;
        auth.release_async().await;
        output
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::registry::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;

    fn runner() -> ToolRunner {
        ToolRunner::new(
            Duration::from_secs(5),
            RetryPolicy {
                max_retries: 0,
                backoff: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn test_command_line() {
        let store = AuthStore::from_entries([("quay.io", json!({"auth": "x"}))]);
        let auth = ScopedAuthFile::acquire(&store, "quay.io/a@sha256:aa").expect("acquire");
        let client = OrasClient::new("oras", runner(), Arc::new(AuthStore::default()));

        let display = client.command(&auth, "quay.io/a@sha256:aa").display();
        assert!(display.starts_with("oras manifest fetch --registry-config "));
        assert!(display.ends_with(" quay.io/a@sha256:aa"));
        assert!(display.contains(&auth.config_path().display().to_string()));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_spawning() {
        let client = OrasClient::new(
            "/nonexistent/oras",
            runner(),
            Arc::new(AuthStore::default()),
        );
        let err = client
            .fetch_manifest("quay.io/a@sha256:aa")
            .await
            .expect_err("no credentials");
        assert_eq!(err.kind_name(), "configuration");
    }

    #[tokio::test]
    async fn test_anonymous_fetch_reaches_the_tool() {
        let client = OrasClient::new(
            "/nonexistent/oras",
            runner(),
            Arc::new(AuthStore::default()),
        )
        .with_require_auth(false);
        let err = client
            .fetch_manifest("quay.io/a@sha256:aa")
            .await
            .expect_err("tool missing");
        assert_eq!(err.kind_name(), "subprocess");
    }
}
