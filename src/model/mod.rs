//! Release data model.
//!
//! Digests, resolved manifest trees and the snapshot of components being
//! released. All of these are built once at the start of a run and only read
//! afterwards; the SBOM documents themselves stay untyped
//! [`serde_json::Value`]s so that fields the rewrite does not touch
//! round-trip unchanged.

mod digest;
mod image;
mod snapshot;

pub use digest::{Digest, SHA256_PREFIX};
pub use image::{Image, IndexImage, ResolvedImage};
pub use snapshot::{
    make_reference, Component, ComponentRequest, ComponentSpec, Snapshot, SnapshotSpec,
};
