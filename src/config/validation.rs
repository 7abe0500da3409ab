//! Configuration validation for component-sbom.

use super::defaults::MAX_RETRIES_LIMIT;
use super::types::{AppConfig, AuthConfig, ManifestConfig, SubprocessConfig, ToolsConfig};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.tools.validate());
        errors.extend(self.subprocess.validate());
        errors.extend(self.auth.validate());
        errors.extend(self.manifest.validate());
        errors
    }
}

impl Validatable for ToolsConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.oras.as_os_str().is_empty() {
            errors.push(ConfigError::new("tools.oras", "Tool path must not be empty"));
        }
        if self.cosign.as_os_str().is_empty() {
            errors.push(ConfigError::new("tools.cosign", "Tool path must not be empty"));
        }
        errors
    }
}

impl Validatable for SubprocessConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.timeout_secs == 0 {
            errors.push(ConfigError::new(
                "subprocess.timeout_secs",
                "Timeout must be at least 1 second",
            ));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            errors.push(ConfigError::new(
                "subprocess.max_retries",
                format!(
                    "At most {MAX_RETRIES_LIMIT} retries are allowed, got {}",
                    self.max_retries
                ),
            ));
        }
        errors
    }
}

impl Validatable for AuthConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(ref file) = self.file {
            if file.as_os_str().is_empty() {
                errors.push(ConfigError::new("auth.file", "Path must not be empty"));
            }
        }
        errors
    }
}

impl Validatable for ManifestConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.max_index_depth == 0 {
            errors.push(ConfigError::new(
                "manifest.max_index_depth",
                "Depth must be at least 1",
            ));
        }
        errors
    }
}
