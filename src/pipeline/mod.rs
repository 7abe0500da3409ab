//! Release pipeline orchestration.
//!
//! Resolution turns validated component requests into a [`Snapshot`]
//! (`crate::model::Snapshot`); the update stage then rewrites every SBOM the
//! snapshot covers. Both stages collect per-unit outcomes into a
//! [`RunReport`] rather than stopping at the first failure.

mod output;
mod report;
mod resolve_stage;
mod update_stage;

pub use output::{document_path, ensure_destination, write_document, write_output, OutputTarget};
pub use report::{format_error_chain, RunReport, UnitKind, UnitOutcome, UnitStatus};
pub use resolve_stage::{resolve_snapshot, SnapshotResolution};
pub use update_stage::SbomUpdater;

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// Every unit was processed successfully
    pub const SUCCESS: i32 = 0;
    /// At least one unit failed; the others were still processed
    pub const UNIT_FAILURES: i32 = 1;
    /// The run could not start (bad config, invalid snapshot, unreadable credentials)
    pub const ERROR: i32 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_values() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::UNIT_FAILURES, 1);
        assert_eq!(exit_codes::ERROR, 2);
    }
}
