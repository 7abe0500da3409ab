//! Resolve command handler.
//!
//! Implements the `resolve` subcommand, which prints the resolved manifest
//! tree of every snapshot component without touching any SBOM.

use super::{build_resolver, load_requests, load_store};
use crate::config::ResolveConfig;
use crate::pipeline::{exit_codes, resolve_snapshot, write_output, OutputTarget, RunReport};
use anyhow::{Context, Result};

/// Run the resolve command
pub async fn run_resolve(config: ResolveConfig) -> Result<i32> {
    let requests = load_requests(&config.snapshot_path)?;
    let store = load_store(&config.app)?;

    let resolver = build_resolver(&config.app, store);
    let resolution = resolve_snapshot(&resolver, &requests).await;

    let json = serde_json::to_string_pretty(&resolution.snapshot)
        .context("failed to serialize resolved snapshot")?;
    write_output(&json, &OutputTarget::from_option(config.output_file)).await?;

    let report = RunReport::new(resolution.failures);
    if report.is_success() {
        Ok(exit_codes::SUCCESS)
    } else {
        report.log_summary();
        Ok(exit_codes::UNIT_FAILURES)
    }
}
