//! Resolved image manifest trees.

use super::Digest;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single-architecture image manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Image {
    pub digest: Digest,
}

impl Image {
    #[must_use]
    pub const fn new(digest: Digest) -> Self {
        Self { digest }
    }
}

/// A multi-architecture index (OCI image index or Docker manifest list).
///
/// `children` holds every leaf image reachable from the index, in document
/// order. Nested indexes are flattened away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndexImage {
    pub digest: Digest,
    pub children: Vec<Image>,
}

impl IndexImage {
    #[must_use]
    pub const fn new(digest: Digest, children: Vec<Image>) -> Self {
        Self { digest, children }
    }

    /// Whether `digest` names one of this index's leaf children.
    #[must_use]
    pub fn has_child(&self, digest: &str) -> bool {
        self.children.iter().any(|c| c.digest.as_str() == digest)
    }
}

/// What a manifest reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedImage {
    Image(Image),
    Index(IndexImage),
}

impl ResolvedImage {
    /// Digest of the top-level manifest.
    #[must_use]
    pub const fn digest(&self) -> &Digest {
        match self {
            Self::Image(image) => &image.digest,
            Self::Index(index) => &index.digest,
        }
    }

    #[must_use]
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Short label used in logs and run reports.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Index(_) => "index",
        }
    }

    /// Every image whose SBOM belongs to this tree: the index itself followed
    /// by each child, or just the single image.
    #[must_use]
    pub fn units(&self) -> Vec<Self> {
        match self {
            Self::Image(_) => vec![self.clone()],
            Self::Index(index) => std::iter::once(self.clone())
                .chain(index.children.iter().cloned().map(Self::Image))
                .collect(),
        }
    }
}

impl From<Image> for ResolvedImage {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

impl From<IndexImage> for ResolvedImage {
    fn from(index: IndexImage) -> Self {
        Self::Index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(hex: &str) -> Digest {
        Digest::parse(&format!("sha256:{hex}")).expect("valid digest")
    }

    #[test]
    fn test_index_units_include_index_first() {
        let index = ResolvedImage::Index(IndexImage::new(
            digest("aa"),
            vec![Image::new(digest("bb")), Image::new(digest("cc"))],
        ));

        let units = index.units();
        assert_eq!(units.len(), 3);
        assert!(units[0].is_index());
        assert_eq!(units[1].digest().as_str(), "sha256:bb");
        assert_eq!(units[2].digest().as_str(), "sha256:cc");
    }

    #[test]
    fn test_image_is_single_unit() {
        let image = ResolvedImage::Image(Image::new(digest("aa")));
        assert_eq!(image.units(), vec![image.clone()]);
        assert_eq!(image.kind_name(), "image");
    }

    #[test]
    fn test_has_child() {
        let index = IndexImage::new(digest("aa"), vec![Image::new(digest("bb"))]);
        assert!(index.has_child("sha256:bb"));
        assert!(!index.has_child("sha256:aa"));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let image = ResolvedImage::Image(Image::new(digest("aa")));
        let value = serde_json::to_value(&image).expect("serialize");
        assert_eq!(value["kind"], "image");
        assert_eq!(value["digest"], "sha256:aa");
    }
}
