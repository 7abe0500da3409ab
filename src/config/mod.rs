//! Configuration module for component-sbom.
//!
//! This module provides:
//! - Type-safe configuration structures with defaults
//! - Validation for all configuration values
//! - YAML config file loading and discovery
//! - CLI override merging
//!
//! # Configuration File
//!
//! Place a `.component-sbom.yaml` file in the working directory or
//! `~/.config/component-sbom/`:
//!
//! ```yaml
//! subprocess:
//!   timeout_secs: 120
//! auth:
//!   file: /run/secrets/registry-auth.json
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{
    default_auth_file, DEFAULT_MAX_INDEX_DEPTH, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF_MS,
    DEFAULT_TIMEOUT_SECS, MAX_RETRIES_LIMIT,
};
pub use types::{
    AppConfig, AuthConfig, ConfigOverrides, ManifestConfig, ResolveConfig, SubprocessConfig,
    ToolsConfig, UpdateConfig,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    ConfigFileError,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// Editors can use it to validate and complete `.component-sbom.yaml`.
pub fn generate_json_schema() -> serde_json::Result<String> {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_lists_sections() {
        let schema = generate_json_schema().expect("schema serializes");
        for section in ["tools", "subprocess", "auth", "manifest"] {
            assert!(schema.contains(section), "schema should mention {section}");
        }
    }
}
