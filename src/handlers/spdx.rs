//! SPDX 2.3 release rewriting.
//!
//! The handler relocates package identifiers from build coordinates to
//! release coordinates:
//!
//! - `document.name` becomes `<repository>@<digest>`
//! - the package whose SHA256 checksum equals the target digest gets one
//!   purl reference per release tag
//! - for index documents, every package matching a child image digest is
//!   rebuilt the same way while keeping the `arch` qualifier of its
//!   build-time purl
//!
//! All lookups are completed before the document is touched, so a failed
//! rewrite leaves the document exactly as it was loaded. Checksums are read
//! but never written, which makes the rewrite idempotent.

use super::purl::{make_purl_ref, parse_purl, OciPurl, PurlInfo};
use crate::error::{Result, SbomError};
use crate::model::{make_reference, Component, Digest, Image, IndexImage, ResolvedImage};
use serde_json::Value;
use std::collections::HashMap;

/// The only SPDX version this handler rewrites.
pub const SPDX_2_3: &str = "SPDX-2.3";

const SHA256_ALGORITHM: &str = "SHA256";

/// Positions of packages by their SHA256 checksum hex.
///
/// Built once per document; a checksum shared by several packages maps to
/// all of them in document order.
#[derive(Debug, Default)]
struct ChecksumIndex {
    positions: HashMap<String, Vec<usize>>,
}

impl ChecksumIndex {
    fn build(document: &Value) -> Self {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, package) in packages(document).iter().enumerate() {
            if let Some(hex) = sha256_checksum(package) {
                positions.entry(hex.to_string()).or_default().push(pos);
            }
        }
        Self { positions }
    }

    /// First package carrying `digest`.
    fn first(&self, digest: &Digest) -> Option<usize> {
        self.all(digest).first().copied()
    }

    fn all(&self, digest: &Digest) -> &[usize] {
        self.positions
            .get(digest.hex())
            .map_or(&[], Vec::as_slice)
    }
}

/// A planned replacement of one package's external references.
struct RefUpdate {
    position: usize,
    refs: Vec<Value>,
}

/// Rewrites SPDX 2.3 documents in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Spdx23Handler;

impl Spdx23Handler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[must_use]
    pub const fn supported_version(&self) -> &'static str {
        SPDX_2_3
    }

    /// Rewrite `document`, the SBOM of `image`, for `component`.
    pub fn update_document(
        &self,
        component: &Component,
        image: &ResolvedImage,
        document: &mut Value,
    ) -> Result<()> {
        match image {
            ResolvedImage::Index(index) => self.update_index_document(component, index, document),
            ResolvedImage::Image(image) => self.update_image_document(component, image, document),
        }
    }

    /// Rewrite the SBOM of a multi-arch index.
    pub fn update_index_document(
        &self,
        component: &Component,
        index: &IndexImage,
        document: &mut Value,
    ) -> Result<()> {
        self.check_version(document)?;

        let checksums = ChecksumIndex::build(document);
        let index_pos = checksums
            .first(&index.digest)
            .ok_or_else(|| package_not_found(&index.digest))?;

        let mut updates = vec![RefUpdate {
            position: index_pos,
            refs: release_refs(component, &index.digest, None)?,
        }];

        let all_packages = packages(document);
        for child in &index.children {
            for &position in checksums.all(&child.digest) {
                if position == index_pos {
                    continue;
                }
                let package = &all_packages[position];

                // The arch qualifier only survives on the build-time purl,
                // which names the index digest. Fall back to one naming the
                // child itself so a second run still finds it.
                let Some(original) = find_purl_with_version(package, &index.digest)
                    .or_else(|| find_purl_with_version(package, &child.digest))
                else {
                    tracing::warn!(
                        "Package {} matches child {} but has no purl to take its arch from; leaving it unchanged",
                        package_id(package),
                        child.digest
                    );
                    continue;
                };

                updates.push(RefUpdate {
                    position,
                    refs: release_refs(component, &child.digest, original.arch.as_deref())?,
                });
            }
        }

        apply(document, component, &index.digest, updates);
        Ok(())
    }

    /// Rewrite the SBOM of a single image.
    pub fn update_image_document(
        &self,
        component: &Component,
        image: &Image,
        document: &mut Value,
    ) -> Result<()> {
        self.check_version(document)?;

        let position = ChecksumIndex::build(document)
            .first(&image.digest)
            .ok_or_else(|| package_not_found(&image.digest))?;
        let refs = release_refs(component, &image.digest, None)?;

        apply(document, component, &image.digest, vec![RefUpdate { position, refs }]);
        Ok(())
    }

    fn check_version(&self, document: &Value) -> Result<()> {
        let found = document.get("spdxVersion").and_then(Value::as_str);
        if found == Some(SPDX_2_3) {
            return Ok(());
        }
        Err(SbomError::VersionMismatch {
            found: found.unwrap_or("<missing>").to_string(),
            supported: SPDX_2_3.to_string(),
        })
    }
}

fn package_not_found(digest: &Digest) -> SbomError {
    SbomError::PackageNotFound {
        digest: digest.to_string(),
    }
}

fn packages(document: &Value) -> &[Value] {
    document
        .get("packages")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn package_id(package: &Value) -> &str {
    package
        .get("SPDXID")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
}

/// Hex value of the first SHA256 checksum on a package.
fn sha256_checksum(package: &Value) -> Option<&str> {
    package
        .get("checksums")?
        .as_array()?
        .iter()
        .find(|c| c.get("algorithm").and_then(Value::as_str) == Some(SHA256_ALGORITHM))?
        .get("checksumValue")?
        .as_str()
}

/// First purl reference on `package` whose version is `digest`.
fn find_purl_with_version(package: &Value, digest: &Digest) -> Option<PurlInfo> {
    package
        .get("externalRefs")?
        .as_array()?
        .iter()
        .filter(|r| r.get("referenceType").and_then(Value::as_str) == Some("purl"))
        .filter_map(|r| r.get("referenceLocator").and_then(Value::as_str))
        .filter_map(|locator| parse_purl(locator).ok())
        .find(|info| info.version.as_deref() == Some(digest.as_str()))
}

/// One purl reference per release tag.
fn release_refs(component: &Component, digest: &Digest, arch: Option<&str>) -> Result<Vec<Value>> {
    component
        .tags
        .iter()
        .map(|tag| {
            OciPurl::new(&component.repository, digest)
                .with_arch(arch)
                .with_tag(Some(tag))
                .build()
                .map(|purl| make_purl_ref(&purl))
        })
        .collect()
}

fn apply(document: &mut Value, component: &Component, digest: &Digest, updates: Vec<RefUpdate>) {
    if let Some(root) = document.as_object_mut() {
        root.insert(
            "name".to_string(),
            Value::String(make_reference(&component.repository, digest)),
        );
    }

    let Some(packages) = document.get_mut("packages").and_then(Value::as_array_mut) else {
        return;
    };
    for update in updates {
        if let Some(package) = packages
            .get_mut(update.position)
            .and_then(Value::as_object_mut)
        {
            package.insert("externalRefs".to_string(), Value::Array(update.refs));
        }
    }
}
