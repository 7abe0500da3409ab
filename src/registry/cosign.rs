//! `cosign`-backed SBOM download.

use super::{AuthStore, SbomSource, ScopedAuthFile, ToolCommand, ToolRunner};
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Downloads attached SBOMs with `cosign download sbom`.
///
/// cosign reads registry credentials from `$DOCKER_CONFIG/config.json`, so
/// each download points `DOCKER_CONFIG` at its own scoped directory.
#[derive(Debug, Clone)]
pub struct CosignClient {
    program: PathBuf,
    runner: ToolRunner,
    auth: Arc<AuthStore>,
    require_auth: bool,
}

impl CosignClient {
    pub fn new(program: impl Into<PathBuf>, runner: ToolRunner, auth: Arc<AuthStore>) -> Self {
        Self {
            program: program.into(),
            runner,
            auth,
            require_auth: true,
        }
    }

    #[must_use]
    pub const fn with_require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    fn command(&self, auth: &ScopedAuthFile, reference: &str) -> ToolCommand {
        ToolCommand::new(&self.program)
            .args(["download", "sbom"])
            .arg(reference)
            .env("DOCKER_CONFIG", auth.config_dir())
    }
}

impl SbomSource for CosignClient {
    async fn download_sbom(&self, reference: &str) -> Result<Vec<u8>> {
        let auth = ScopedAuthFile::acquire_async(&self.auth, reference).await?;
        if let Err(err) = auth.ensure_found(self.require_auth) {
            auth.release_async().await;
            return Err(err);
        }

        tracing::debug!("Downloading SBOM for {}", reference);
        let output = self.runner.run(&self.command(&auth, reference)).await;
        auth.release_async().await;
        output
    }
}
