//! Collaborator seams.
//!
//! The rewrite pipeline only needs two things from the outside world: raw
//! manifests and raw SBOM documents. Both are expressed as traits so the
//! subprocess-backed clients can be replaced with in-memory fakes.

use crate::error::Result;

/// Fetches raw image manifests.
#[allow(async_fn_in_trait)]
pub trait ManifestSource {
    /// Return the manifest JSON for `reference` (`<repository>@<digest>`).
    async fn fetch_manifest(&self, reference: &str) -> Result<Vec<u8>>;
}

/// Downloads the SBOM attached to an image.
#[allow(async_fn_in_trait)]
pub trait SbomSource {
    /// Return the SBOM document bytes for `reference`.
    async fn download_sbom(&self, reference: &str) -> Result<Vec<u8>>;
}

impl<T: ManifestSource + ?Sized> ManifestSource for &T {
    async fn fetch_manifest(&self, reference: &str) -> Result<Vec<u8>> {
        (**self).fetch_manifest(reference).await
    }
}

impl<T: SbomSource + ?Sized> SbomSource for &T {
    async fn download_sbom(&self, reference: &str) -> Result<Vec<u8>> {
        (**self).download_sbom(reference).await
    }
}
