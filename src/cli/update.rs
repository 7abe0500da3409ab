//! Update command handler.
//!
//! Implements the `update` subcommand: resolve every snapshot component,
//! rewrite each SBOM with release coordinates and store it by digest.

use super::{build_resolver, load_requests, load_store, tool_runner};
use crate::config::UpdateConfig;
use crate::pipeline::{
    ensure_destination, exit_codes, resolve_snapshot, write_output, OutputTarget, RunReport,
    SbomUpdater,
};
use crate::registry::CosignClient;
use anyhow::{Context, Result};

/// Run the update command
pub async fn run_update(config: UpdateConfig) -> Result<i32> {
    let requests = load_requests(&config.snapshot_path)?;
    let store = load_store(&config.app)?;
    ensure_destination(&config.output_dir)
        .await
        .with_context(|| format!("cannot prepare {}", config.output_dir.display()))?;

    let resolver = build_resolver(&config.app, store.clone());
    let resolution = resolve_snapshot(&resolver, &requests).await;

    let cosign = CosignClient::new(&config.app.tools.cosign, tool_runner(&config.app), store)
        .with_require_auth(config.app.auth.require);
    let updater = SbomUpdater::new(cosign, &config.output_dir);

    let mut report = RunReport::new(resolution.failures);
    report.extend(updater.update_sboms(&resolution.snapshot).await.outcomes);
    report.log_summary();

    if let Some(path) = config.report_file {
        let json = report.to_json().context("failed to serialize run report")?;
        write_output(&json, &OutputTarget::File(path)).await?;
    }

    Ok(if report.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::UNIT_FAILURES
    })
}
