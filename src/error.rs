//! Unified error types for component-sbom.
//!
//! Every failure that can end a unit of work (one image, one document) maps
//! onto a variant of [`SbomError`]. The orchestrator collects these per unit
//! instead of aborting the whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for component-sbom operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SbomError {
    /// Credential store or application configuration is missing or unusable
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed JSON or invalid field values in an input document
    #[error("Failed to parse {context}")]
    Parse {
        context: String,
        #[source]
        source: ParseErrorKind,
    },

    /// The manifest resolver met a media type it cannot classify
    #[error("Unsupported manifest media type '{media_type}' for {reference}")]
    UnsupportedMediaType {
        reference: String,
        media_type: String,
    },

    /// No rewrite handler exists for the document dialect
    #[error("Unsupported SBOM format for {reference}: {reason}")]
    UnsupportedSbomFormat { reference: String, reason: String },

    /// The document version disagrees with the selected handler
    #[error("Called update on unsupported version {found}, supported version is {supported}")]
    VersionMismatch { found: String, supported: String },

    /// No package in the document carries the expected checksum
    #[error("Could not find SPDX package with SHA256 checksum for {digest}")]
    PackageNotFound { digest: String },

    /// An external collaborator exited unsuccessfully
    #[error("{program} failed{}: {message}", exit_suffix(.status))]
    Subprocess {
        program: String,
        status: Option<i32>,
        message: String,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific parse error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Invalid field value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Malformed PURL: {purl} - {reason}")]
    InvalidPurl { purl: String, reason: String },

    #[error("Invalid digest '{0}': expected sha256:<lowercase hex>")]
    InvalidDigest(String),
}

fn exit_suffix(status: &Option<i32>) -> String {
    status.map(|code| format!(" with exit code {code}")).unwrap_or_default()
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for component-sbom operations
pub type Result<T> = std::result::Result<T, SbomError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl SbomError {
    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, source: ParseErrorKind) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    /// Create a parse error for an invalid field value
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::parse(
            "invalid field value",
            ParseErrorKind::InvalidValue {
                field: field.into(),
                message: message.into(),
            },
        )
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a subprocess failure carrying the captured diagnostic text
    pub fn subprocess(
        program: impl Into<String>,
        status: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self::Subprocess {
            program: program.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short machine-friendly name of the error class, used in run reports.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Parse { .. } => "parse",
            Self::UnsupportedMediaType { .. } => "unsupported-media-type",
            Self::UnsupportedSbomFormat { .. } => "unsupported-sbom-format",
            Self::VersionMismatch { .. } => "version-mismatch",
            Self::PackageNotFound { .. } => "package-not-found",
            Self::Subprocess { .. } => "subprocess",
            Self::Io { .. } => "io",
            Self::Validation(_) => "validation",
        }
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for SbomError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SbomError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(
            "JSON deserialization",
            ParseErrorKind::InvalidJson(err.to_string()),
        )
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Context is prepended to whatever context the error already carries, so a
/// failure deep inside snapshot loading reads as
/// `"loading snapshot: component 2: invalid field value"`.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure (lazy evaluation).
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<SbomError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
///
/// Variants with structured payloads (media types, versions, digests) keep
/// their payload untouched; the unit outcome already names the reference.
fn add_context_to_error(err: SbomError, new_ctx: &str) -> SbomError {
    match err {
        SbomError::Parse {
            context: existing,
            source,
        } => SbomError::Parse {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomError::Io {
            path,
            message,
            source,
        } => SbomError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        SbomError::Config(msg) => SbomError::Config(chain_context(new_ctx, &msg)),
        SbomError::Validation(msg) => SbomError::Validation(chain_context(new_ctx, &msg)),
        other => other,
    }
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to an error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to an error with context from a closure.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| SbomError::Validation(context.into()))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| SbomError::Validation(f().into()))
    }
}
