//! SBOM dialect dispatch and rewrite handlers.
//!
//! Dispatch is a closed enum: each supported dialect has a variant, and
//! every recognized-but-unimplemented or unknown document fails with
//! [`SbomError::UnsupportedSbomFormat`] instead of passing through.

pub mod purl;
mod spdx;

pub use purl::{construct_purl, make_purl_ref, parse_purl, OciPurl, PurlInfo};
pub use spdx::{Spdx23Handler, SPDX_2_3};

use crate::error::{Result, SbomError};
use crate::model::{Component, ResolvedImage};
use serde_json::Value;

/// Document dialect, read from its discriminant fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SbomDialect {
    /// An SPDX document with its `spdxVersion`.
    Spdx { version: String },
    /// A CycloneDX document with its `specVersion`, if present.
    CycloneDx { spec_version: Option<String> },
}

impl SbomDialect {
    /// Identify a document, or `None` if it carries neither discriminant.
    #[must_use]
    pub fn detect(document: &Value) -> Option<Self> {
        if let Some(version) = document.get("spdxVersion").and_then(Value::as_str) {
            return Some(Self::Spdx {
                version: version.to_string(),
            });
        }
        if document.get("bomFormat").and_then(Value::as_str) == Some("CycloneDX") {
            return Some(Self::CycloneDx {
                spec_version: document
                    .get("specVersion")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
            });
        }
        None
    }
}

impl std::fmt::Display for SbomDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spdx { version } => write!(f, "{version}"),
            Self::CycloneDx {
                spec_version: Some(version),
            } => write!(f, "CycloneDX {version}"),
            Self::CycloneDx { spec_version: None } => write!(f, "CycloneDX"),
        }
    }
}

/// A rewrite handler for one supported dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbomHandler {
    Spdx23(Spdx23Handler),
}

impl SbomHandler {
    /// Pick the handler for `document`, if its dialect is implemented.
    #[must_use]
    pub fn select(document: &Value) -> Option<Self> {
        match SbomDialect::detect(document)? {
            SbomDialect::Spdx { version } if version == SPDX_2_3 => {
                Some(Self::Spdx23(Spdx23Handler::new()))
            }
            _ => None,
        }
    }

    /// Like [`select`](Self::select), but explains why no handler applies.
    pub fn for_document(document: &Value, reference: &str) -> Result<Self> {
        if let Some(handler) = Self::select(document) {
            return Ok(handler);
        }

        let reason = match SbomDialect::detect(document) {
            Some(dialect @ SbomDialect::CycloneDx { .. }) => {
                format!("{dialect} documents cannot be rewritten yet")
            }
            Some(dialect @ SbomDialect::Spdx { .. }) => {
                format!("{dialect} is not supported, only {SPDX_2_3} is")
            }
            None => "document has neither spdxVersion nor bomFormat".to_string(),
        };

        Err(SbomError::UnsupportedSbomFormat {
            reference: reference.to_string(),
            reason,
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Spdx23(_) => SPDX_2_3,
        }
    }

    /// Rewrite `document` in place for `component`.
    pub fn update_document(
        &self,
        component: &Component,
        image: &ResolvedImage,
        document: &mut Value,
    ) -> Result<()> {
        match self {
            Self::Spdx23(handler) => handler.update_document(component, image, document),
        }
    }
}
