//! Manifest resolution.
//!
//! Classifies a top-level manifest as a single image or a multi-arch index
//! and, for indexes, collects the leaf images it lists. Child descriptors
//! are classified by their declared media type, so only nested indexes cost
//! an extra fetch.

use super::ManifestSource;
use crate::error::{ErrorContext, Result, SbomError};
use crate::model::{make_reference, Digest, Image, IndexImage, ResolvedImage};
use futures::future::{join_all, FutureExt, LocalBoxFuture};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

pub const OCI_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const OCI_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Default bound on index nesting.
pub const DEFAULT_MAX_INDEX_DEPTH: usize = 8;

/// Whether a manifest describes one image or a list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Image,
    Index,
}

impl ManifestKind {
    /// Classify a media type string.
    #[must_use]
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            OCI_IMAGE_MANIFEST | DOCKER_MANIFEST_V2 => Some(Self::Image),
            OCI_IMAGE_INDEX | DOCKER_MANIFEST_LIST => Some(Self::Index),
            _ => None,
        }
    }
}

/// The manifest fields resolution looks at.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub manifests: Option<Vec<Descriptor>>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub layers: Option<Vec<Value>>,
}

/// An entry of an index's `manifests` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
}

impl Manifest {
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Determine the manifest kind.
    ///
    /// An explicit top-level media type must be one of the four supported
    /// types. Without one, the manifest is classified by shape: a
    /// `manifests` list makes it an index, `config` plus `layers` an image.
    pub fn classify(&self, reference: &str) -> Result<ManifestKind> {
        if let Some(media_type) = &self.media_type {
            return ManifestKind::from_media_type(media_type).ok_or_else(|| {
                SbomError::UnsupportedMediaType {
                    reference: reference.to_string(),
                    media_type: media_type.clone(),
                }
            });
        }

        if self.manifests.is_some() {
            Ok(ManifestKind::Index)
        } else if self.config.is_some() && self.layers.is_some() {
            Ok(ManifestKind::Image)
        } else {
            Err(SbomError::UnsupportedMediaType {
                reference: reference.to_string(),
                media_type: "<missing>".to_string(),
            })
        }
    }
}

enum Entry {
    Leaf(Image),
    Nested(Digest),
}

/// Resolves digests in a repository into [`ResolvedImage`] trees.
#[derive(Debug, Clone)]
pub struct ManifestResolver<M> {
    source: M,
    max_depth: usize,
}

impl<M: ManifestSource> ManifestResolver<M> {
    pub const fn new(source: M) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_INDEX_DEPTH,
        }
    }

    /// Limit how many index levels may be nested. A value of 1 accepts
    /// only indexes that list images directly.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub const fn source(&self) -> &M {
        &self.source
    }

    /// Resolve `repository@digest`.
    pub async fn resolve(&self, repository: &str, digest: &Digest) -> Result<ResolvedImage> {
        let reference = make_reference(repository, digest);
        let manifest = self.fetch(&reference).await?;

        match manifest.classify(&reference)? {
            ManifestKind::Image => {
                tracing::debug!("{} is a single image", reference);
                Ok(ResolvedImage::Image(Image::new(digest.clone())))
            }
            ManifestKind::Index => {
                let children = self
                    .collect_leaves(repository, &reference, &manifest, 1)
                    .await?;
                tracing::debug!("{} is an index with {} images", reference, children.len());
                Ok(ResolvedImage::Index(IndexImage::new(digest.clone(), children)))
            }
        }
    }

    async fn fetch(&self, reference: &str) -> Result<Manifest> {
        let raw = self.source.fetch_manifest(reference).await?;
        Manifest::from_slice(&raw).with_context(|| format!("manifest for {reference}"))
    }

    /// Leaf images of `manifest`, an index found at nesting level `depth`.
    fn collect_leaves<'a>(
        &'a self,
        repository: &'a str,
        reference: &'a str,
        manifest: &'a Manifest,
        depth: usize,
    ) -> LocalBoxFuture<'a, Result<Vec<Image>>> {
        async move {
            if depth > self.max_depth {
                return Err(SbomError::validation(format!(
                    "index nesting at {reference} exceeds the maximum depth of {}",
                    self.max_depth
                )));
            }

            let descriptors = manifest.manifests.as_deref().unwrap_or_default();
            if descriptors.is_empty() {
                return Err(SbomError::validation(format!(
                    "index {reference} lists no manifests"
                )));
            }

            let mut entries = Vec::with_capacity(descriptors.len());
            for descriptor in descriptors {
                let digest = Digest::parse(&descriptor.digest)
                    .with_context(|| format!("child of {reference}"))?;

                let kind = match descriptor.media_type.as_deref() {
                    None => ManifestKind::Image,
                    Some(media_type) => {
                        ManifestKind::from_media_type(media_type).ok_or_else(|| {
                            SbomError::UnsupportedMediaType {
                                reference: make_reference(repository, &digest),
                                media_type: media_type.to_string(),
                            }
                        })?
                    }
                };

                entries.push(match kind {
                    ManifestKind::Image => Entry::Leaf(Image::new(digest)),
                    ManifestKind::Index => Entry::Nested(digest),
                });
            }

            let nested = join_all(entries.iter().filter_map(|entry| match entry {
                Entry::Nested(digest) => Some(self.resolve_nested(repository, digest, depth + 1)),
                Entry::Leaf(_) => None,
            }))
            .await;

            let mut nested = nested.into_iter();
            let mut seen = HashSet::new();
            let mut children = Vec::new();
            for entry in entries {
                let images = match entry {
                    Entry::Leaf(image) => vec![image],
                    Entry::Nested(_) => match nested.next() {
                        Some(result) => result?,
                        None => Vec::new(),
                    },
                };
                for image in images {
                    if seen.insert(image.digest.clone()) {
                        children.push(image);
                    }
                }
            }

            Ok(children)
        }
        .boxed_local()
    }

    async fn resolve_nested(
        &self,
        repository: &str,
        digest: &Digest,
        depth: usize,
    ) -> Result<Vec<Image>> {
        let reference = make_reference(repository, digest);
        let manifest = self.fetch(&reference).await?;

        match manifest.classify(&reference)? {
            ManifestKind::Image => Ok(vec![Image::new(digest.clone())]),
            ManifestKind::Index => {
                self.collect_leaves(repository, &reference, &manifest, depth)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeRegistry {
        manifests: HashMap<String, Value>,
        fetched: RefCell<Vec<String>>,
    }

    impl FakeRegistry {
        fn with(mut self, reference: &str, manifest: Value) -> Self {
            self.manifests.insert(reference.to_string(), manifest);
            self
        }
    }

    impl ManifestSource for FakeRegistry {
        async fn fetch_manifest(&self, reference: &str) -> Result<Vec<u8>> {
            self.fetched.borrow_mut().push(reference.to_string());
            let manifest = self
                .manifests
                .get(reference)
                .ok_or_else(|| SbomError::subprocess("oras", Some(1), "manifest unknown"))?;
            Ok(serde_json::to_vec(manifest)?)
        }
    }

    fn digest(hex: &str) -> Digest {
        Digest::parse(&format!("sha256:{hex}")).expect("valid digest")
    }

    fn image_manifest() -> Value {
        json!({"mediaType": OCI_IMAGE_MANIFEST, "config": {}, "layers": []})
    }

    fn index_manifest(children: &[(&str, &str)]) -> Value {
        let manifests: Vec<Value> = children
            .iter()
            .map(|(media_type, hex)| json!({"mediaType": media_type, "digest": format!("sha256:{hex}")}))
            .collect();
        json!({"mediaType": OCI_IMAGE_INDEX, "manifests": manifests})
    }

    #[tokio::test]
    async fn test_single_image() {
        let registry = FakeRegistry::default().with("r.io/app@sha256:aa", image_manifest());
        let resolver = ManifestResolver::new(registry);

        let image = resolver.resolve("r.io/app", &digest("aa")).await.expect("resolves");
        assert_eq!(image, ResolvedImage::Image(Image::new(digest("aa"))));
    }

    #[tokio::test]
    async fn test_docker_manifest_list_children_are_not_fetched() {
        let registry = FakeRegistry::default().with(
            "r.io/app@sha256:aa",
            json!({
                "mediaType": DOCKER_MANIFEST_LIST,
                "manifests": [
                    {"mediaType": DOCKER_MANIFEST_V2, "digest": "sha256:bb"},
                    {"mediaType": DOCKER_MANIFEST_V2, "digest": "sha256:cc"}
                ]
            }),
        );
        let resolver = ManifestResolver::new(registry);

        let image = resolver.resolve("r.io/app", &digest("aa")).await.expect("resolves");
        let ResolvedImage::Index(index) = image else {
            panic!("expected an index");
        };
        assert_eq!(index.digest, digest("aa"));
        assert_eq!(
            index.children,
            vec![Image::new(digest("bb")), Image::new(digest("cc"))]
        );
        assert_eq!(resolver.source().fetched.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_nested_index_is_flattened_in_order() {
        let registry = FakeRegistry::default()
            .with(
                "r.io/app@sha256:aa",
                index_manifest(&[
                    (OCI_IMAGE_MANIFEST, "01"),
                    (OCI_IMAGE_INDEX, "bb"),
                    (OCI_IMAGE_MANIFEST, "04"),
                ]),
            )
            .with(
                "r.io/app@sha256:bb",
                index_manifest(&[(OCI_IMAGE_MANIFEST, "02"), (OCI_IMAGE_MANIFEST, "03")]),
            );
        let resolver = ManifestResolver::new(registry);

        let image = resolver.resolve("r.io/app", &digest("aa")).await.expect("resolves");
        let ResolvedImage::Index(index) = image else {
            panic!("expected an index");
        };
        let children: Vec<&str> = index.children.iter().map(|c| c.digest.hex()).collect();
        assert_eq!(children, vec!["01", "02", "03", "04"]);
    }

    #[tokio::test]
    async fn test_nested_index_beyond_depth_is_rejected() {
        let registry = FakeRegistry::default()
            .with(
                "r.io/app@sha256:aa",
                index_manifest(&[(OCI_IMAGE_INDEX, "bb")]),
            )
            .with(
                "r.io/app@sha256:bb",
                index_manifest(&[(OCI_IMAGE_MANIFEST, "cc")]),
            );
        let resolver = ManifestResolver::new(registry).with_max_depth(1);

        let err = resolver
            .resolve("r.io/app", &digest("aa"))
            .await
            .expect_err("nesting too deep");
        assert_eq!(err.kind_name(), "validation");
    }

    #[tokio::test]
    async fn test_duplicate_children_are_collapsed() {
        let registry = FakeRegistry::default().with(
            "r.io/app@sha256:aa",
            index_manifest(&[(OCI_IMAGE_MANIFEST, "bb"), (OCI_IMAGE_MANIFEST, "bb")]),
        );
        let resolver = ManifestResolver::new(registry);

        let image = resolver.resolve("r.io/app", &digest("aa")).await.expect("resolves");
        let ResolvedImage::Index(index) = image else {
            panic!("expected an index");
        };
        assert_eq!(index.children.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_media_type_is_rejected() {
        let registry = FakeRegistry::default().with(
            "r.io/app@sha256:aa",
            json!({"mediaType": "application/vnd.oci.artifact.manifest.v1+json"}),
        );
        let resolver = ManifestResolver::new(registry);

        let err = resolver
            .resolve("r.io/app", &digest("aa"))
            .await
            .expect_err("unsupported");
        match err {
            SbomError::UnsupportedMediaType {
                reference,
                media_type,
            } => {
                assert_eq!(reference, "r.io/app@sha256:aa");
                assert_eq!(media_type, "application/vnd.oci.artifact.manifest.v1+json");
            }
            other => panic!("Expected UnsupportedMediaType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_child_media_type_is_rejected() {
        let registry = FakeRegistry::default().with(
            "r.io/app@sha256:aa",
            index_manifest(&[(OCI_IMAGE_MANIFEST, "bb"), ("text/plain", "cc")]),
        );
        let resolver = ManifestResolver::new(registry);

        let err = resolver
            .resolve("r.io/app", &digest("aa"))
            .await
            .expect_err("unsupported child");
        assert_eq!(err.kind_name(), "unsupported-media-type");
        assert!(err.to_string().contains("r.io/app@sha256:cc"), "{err}");
    }

    #[tokio::test]
    async fn test_structural_classification_without_media_type() {
        let registry = FakeRegistry::default()
            .with("r.io/app@sha256:aa", json!({"config": {}, "layers": []}))
            .with(
                "r.io/app@sha256:bb",
                json!({"manifests": [{"digest": "sha256:cc"}]}),
            )
            .with("r.io/app@sha256:dd", json!({"schemaVersion": 2}));
        let resolver = ManifestResolver::new(registry);

        assert!(!resolver
            .resolve("r.io/app", &digest("aa"))
            .await
            .expect("image")
            .is_index());
        assert!(resolver
            .resolve("r.io/app", &digest("bb"))
            .await
            .expect("index")
            .is_index());
        assert!(resolver.resolve("r.io/app", &digest("dd")).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_index_is_rejected() {
        let registry = FakeRegistry::default().with("r.io/app@sha256:aa", index_manifest(&[]));
        let resolver = ManifestResolver::new(registry);
        assert!(resolver.resolve("r.io/app", &digest("aa")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let resolver = ManifestResolver::new(FakeRegistry::default());
        let err = resolver
            .resolve("r.io/app", &digest("aa"))
            .await
            .expect_err("missing manifest");
        assert_eq!(err.kind_name(), "subprocess");
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_parse_error() {
        let registry = FakeRegistry::default().with("r.io/app@sha256:aa", json!("not a manifest"));
        let resolver = ManifestResolver::new(registry);
        let err = resolver
            .resolve("r.io/app", &digest("aa"))
            .await
            .expect_err("malformed");
        assert_eq!(err.kind_name(), "parse");
    }
}
