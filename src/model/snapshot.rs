//! Snapshot and component model.
//!
//! A [`SnapshotSpec`] is the raw JSON handed to the tool. It is validated in
//! full into [`ComponentRequest`]s before any registry access; resolving each
//! request's manifest tree then yields the immutable [`Snapshot`] that drives
//! the run.

use super::{Digest, ResolvedImage};
use crate::error::{ErrorContext, OptionContext, Result, SbomError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// `<repository>@sha256:<hex>`, with no tag in the repository part.
static CONTAINER_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^:]+@sha256:[0-9a-f]+$").expect("container image regex is valid")
});

/// OCI distribution tag grammar. Tags end up verbatim in purl qualifiers,
/// so anything outside it (`&`, `=`, whitespace) is rejected up front.
static OCI_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]{0,127}$").expect("tag regex is valid")
});

/// Release tags that identify exactly one build, e.g. `v1.2-20240101` or
/// `rhel-8.4.1-202301011200`.
static UNIQUE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(rhel-)?v?\d+\.\d+(\.\d+)?-\d{8,}$").expect("unique tag regex is valid")
});

// ============================================================================
// Raw snapshot spec
// ============================================================================

/// Snapshot spec file, restricted to the fields this tool consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotSpec {
    pub components: Vec<ComponentSpec>,
}

/// One component entry of the snapshot spec.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentSpec {
    #[serde(rename = "containerImage")]
    pub container_image: String,
    #[serde(rename = "rh-registry-repo")]
    pub rh_registry_repo: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A validated component awaiting manifest resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRequest {
    /// Release repository the image was promoted to.
    pub repository: String,
    /// Digest of the promoted manifest.
    pub digest: Digest,
    pub tags: Vec<String>,
}

impl ComponentRequest {
    /// `<repository>@<digest>` reference in the release repository.
    #[must_use]
    pub fn reference(&self) -> String {
        make_reference(&self.repository, &self.digest)
    }
}

impl SnapshotSpec {
    /// Parse a snapshot spec from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("snapshot spec")
    }

    /// Read and parse a snapshot spec file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SbomError::io(path, e))?;
        Self::from_json(&content).with_context(|| format!("reading {}", path.display()))
    }

    /// Validate every component, failing on the first invalid entry.
    pub fn validate(&self) -> Result<Vec<ComponentRequest>> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.validate().with_context(|| format!("component {i}")))
            .collect()
    }
}

impl ComponentSpec {
    /// Validate the entry and extract its digest.
    pub fn validate(&self) -> Result<ComponentRequest> {
        if !CONTAINER_IMAGE_RE.is_match(&self.container_image) {
            return Err(SbomError::invalid_value(
                "containerImage",
                format!("{} is not a valid digest reference", self.container_image),
            ));
        }

        let digest = self
            .container_image
            .split_once('@')
            .map(|(_, digest)| digest)
            .with_context_none(|| format!("{} has no digest", self.container_image))?;
        let digest = Digest::parse(digest)?;

        validate_repository(&self.rh_registry_repo)?;

        if let Some(tag) = self.tags.iter().find(|tag| !OCI_TAG_RE.is_match(tag)) {
            return Err(SbomError::invalid_value(
                "tags",
                format!("{tag:?} is not a valid image tag"),
            ));
        }

        if self.tags.is_empty() {
            tracing::warn!(
                "Component {} has no tags; its SBOM packages will get no purls",
                self.rh_registry_repo
            );
        }

        Ok(ComponentRequest {
            repository: self.rh_registry_repo.clone(),
            digest,
            tags: self.tags.clone(),
        })
    }
}

/// A release repository must not carry a digest or tag suffix.
fn validate_repository(repository: &str) -> Result<()> {
    let invalid = |message: &str| SbomError::invalid_value("rh-registry-repo", message);

    if repository.is_empty() {
        return Err(invalid("repository is empty"));
    }
    if repository.contains('@') {
        return Err(invalid(&format!("{repository} carries a digest")));
    }
    // A colon in the registry host (port) is fine, one in the last segment is a tag.
    let last_segment = repository.rsplit('/').next().unwrap_or(repository);
    if repository.contains('/') && last_segment.contains(':') {
        return Err(invalid(&format!("{repository} carries a tag")));
    }
    if repository.ends_with('/') {
        return Err(invalid(&format!("{repository} ends with '/'")));
    }
    Ok(())
}

// ============================================================================
// Resolved model
// ============================================================================

/// A unit to release: one repository, its resolved manifest tree and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub repository: String,
    pub image: ResolvedImage,
    pub tags: Vec<String>,
}

impl Component {
    #[must_use]
    pub const fn new(repository: String, image: ResolvedImage, tags: Vec<String>) -> Self {
        Self {
            repository,
            image,
            tags,
        }
    }

    /// First tag, in listed order, that identifies a single build.
    #[must_use]
    pub fn unique_tag(&self) -> Option<&str> {
        self.tags
            .iter()
            .map(String::as_str)
            .find(|tag| UNIQUE_TAG_RE.is_match(tag))
    }

    /// Last path segment of the repository, used as the purl name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.repository.rsplit('/').next().unwrap_or(&self.repository)
    }
}

/// Everything released in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub components: Vec<Component>,
}

impl Snapshot {
    #[must_use]
    pub const fn new(components: Vec<Component>) -> Self {
        Self { components }
    }

    /// Number of SBOM documents the snapshot covers.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.components.iter().map(|c| c.image.units().len()).sum()
    }
}

/// Full reference to an image in a repository.
#[must_use]
pub fn make_reference(repository: &str, digest: &Digest) -> String {
    format!("{repository}@{digest}")
}
