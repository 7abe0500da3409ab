//! Per-unit outcomes and the run report.

use crate::error::SbomError;
use serde::Serialize;
use std::path::PathBuf;

/// What a unit of work was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Resolving a snapshot component's manifest tree.
    Component,
    /// Rewriting the SBOM of a multi-arch index.
    Index,
    /// Rewriting the SBOM of a single image.
    Image,
}

/// Result of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UnitStatus {
    Updated { output: PathBuf },
    Failed { error_kind: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOutcome {
    pub reference: String,
    pub kind: UnitKind,
    #[serde(flatten)]
    pub status: UnitStatus,
}

impl UnitOutcome {
    #[must_use]
    pub fn updated(reference: impl Into<String>, kind: UnitKind, output: PathBuf) -> Self {
        Self {
            reference: reference.into(),
            kind,
            status: UnitStatus::Updated { output },
        }
    }

    #[must_use]
    pub fn failed(reference: impl Into<String>, kind: UnitKind, err: &SbomError) -> Self {
        Self {
            reference: reference.into(),
            kind,
            status: UnitStatus::Failed {
                error_kind: err.kind_name().to_string(),
                error: format_error_chain(err),
            },
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, UnitStatus::Updated { .. })
    }
}

/// Render an error and all of its sources on one line.
#[must_use]
pub fn format_error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Everything a run attempted, in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<UnitOutcome>,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    succeeded: usize,
    failed: usize,
    outcomes: &'a [UnitOutcome],
}

impl RunReport {
    #[must_use]
    pub const fn new(outcomes: Vec<UnitOutcome>) -> Self {
        Self { outcomes }
    }

    /// Append the outcomes of another stage.
    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = UnitOutcome>) {
        self.outcomes.extend(outcomes);
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// A run succeeds only if every unit did.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(UnitOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Pretty JSON with summary counts.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&ReportDocument {
            succeeded: self.succeeded(),
            failed: self.failed(),
            outcomes: &self.outcomes,
        })
    }

    /// Log one line per failure and a closing summary.
    pub fn log_summary(&self) {
        for outcome in self.failures() {
            if let UnitStatus::Failed { error, .. } = &outcome.status {
                tracing::error!("{} {}: {}", outcome.kind_label(), outcome.reference, error);
            }
        }

        if self.is_success() {
            tracing::info!("Updated {} SBOM(s)", self.succeeded());
        } else {
            tracing::error!(
                "{} of {} unit(s) failed",
                self.failed(),
                self.outcomes.len()
            );
        }
    }
}

impl UnitOutcome {
    const fn kind_label(&self) -> &'static str {
        match self.kind {
            UnitKind::Component => "Component",
            UnitKind::Index => "Index",
            UnitKind::Image => "Image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> RunReport {
        RunReport::new(vec![
            UnitOutcome::updated(
                "r.io/a@sha256:aa",
                UnitKind::Index,
                PathBuf::from("/out/sha256:aa"),
            ),
            UnitOutcome::failed(
                "r.io/a@sha256:bb",
                UnitKind::Image,
                &SbomError::PackageNotFound {
                    digest: "sha256:bb".to_string(),
                },
            ),
        ])
    }

    #[test]
    fn test_counts_and_status() {
        let report = sample();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert!(RunReport::default().is_success());
    }

    #[test]
    fn test_json_shape() {
        let json: Value = serde_json::from_str(&sample().to_json().expect("serializes"))
            .expect("valid json");
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"][0]["status"], "updated");
        assert_eq!(json["outcomes"][0]["kind"], "index");
        assert_eq!(json["outcomes"][0]["output"], "/out/sha256:aa");
        assert_eq!(json["outcomes"][1]["status"], "failed");
        assert_eq!(json["outcomes"][1]["error_kind"], "package-not-found");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = SbomError::invalid_value("containerImage", "bad reference");
        let message = format_error_chain(&err);
        assert!(message.contains("invalid field value"), "{message}");
        assert!(message.contains("bad reference"), "{message}");
    }
}
