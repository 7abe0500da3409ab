//! **Release-time SBOM rewriting for container images.**
//!
//! When a container image is promoted from its build repository to a release
//! repository, the package URLs inside its SBOM still point at build-time
//! coordinates. `component-sbom` resolves every image of a release snapshot,
//! downloads the attached SBOMs and rewrites their identifiers to the release
//! repository, digest and tags.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: digests, resolved manifest trees ([`ResolvedImage`]) and
//!   the release [`Snapshot`].
//! - **[`registry`]**: credential scoping ([`AuthStore`]), the external tool
//!   runner, the [`ManifestResolver`] and the `oras`/`cosign` clients behind
//!   the [`ManifestSource`] and [`SbomSource`] traits.
//! - **[`handlers`]**: dialect dispatch ([`SbomHandler`]) and the SPDX 2.3
//!   rewrite.
//! - **[`pipeline`]**: concurrent resolution and rewriting with per-unit
//!   outcomes collected into a [`RunReport`].
//!
//! ## Rewriting a document
//!
//! ```
//! use component_sbom::{Component, Digest, Image, ResolvedImage, SbomHandler};
//! use serde_json::json;
//!
//! let digest = Digest::parse("sha256:deadbeef")?;
//! let image = ResolvedImage::Image(Image::new(digest));
//! let component = Component::new(
//!     "registry.example.com/org/app".to_string(),
//!     image.clone(),
//!     vec!["1.0".to_string()],
//! );
//!
//! let mut document = json!({
//!     "spdxVersion": "SPDX-2.3",
//!     "packages": [{
//!         "SPDXID": "SPDXRef-image",
//!         "checksums": [{"algorithm": "SHA256", "checksumValue": "deadbeef"}]
//!     }]
//! });
//!
//! let handler = SbomHandler::for_document(&document, "registry.example.com/org/app@sha256:deadbeef")?;
//! handler.update_document(&component, &image, &mut document)?;
//! assert_eq!(document["name"], "registry.example.com/org/app@sha256:deadbeef");
//! # Ok::<(), component_sbom::SbomError>(())
//! ```

#![warn(clippy::unwrap_used)]

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod pipeline;
pub mod registry;

pub use error::{ErrorContext, OptionContext, ParseErrorKind, Result, SbomError};
pub use handlers::{construct_purl, SbomDialect, SbomHandler, Spdx23Handler};
pub use model::{
    Component, ComponentRequest, Digest, Image, IndexImage, ResolvedImage, Snapshot, SnapshotSpec,
};
pub use pipeline::{resolve_snapshot, RunReport, SbomUpdater, UnitOutcome};
pub use registry::{
    AuthStore, CosignClient, ManifestResolver, ManifestSource, OrasClient, SbomSource,
    ScopedAuthFile,
};
