//! Registry access.
//!
//! Credential scoping, the external tool runner, manifest resolution and the
//! `oras`/`cosign` clients that implement the collaborator traits.

mod auth;
mod cosign;
mod manifest;
mod oras;
mod tools;
mod traits;

pub use auth::{write_scoped_auth, AuthStore, ScopedAuth, ScopedAuthFile, AUTH_FILE_NAME};
pub use cosign::CosignClient;
pub use manifest::{
    Descriptor, Manifest, ManifestKind, ManifestResolver, DEFAULT_MAX_INDEX_DEPTH,
    DOCKER_MANIFEST_LIST, DOCKER_MANIFEST_V2, OCI_IMAGE_INDEX, OCI_IMAGE_MANIFEST,
};
pub use oras::OrasClient;
pub use tools::{RetryPolicy, ToolCommand, ToolRunner};
pub use traits::{ManifestSource, SbomSource};
