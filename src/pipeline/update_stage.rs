//! Concurrent SBOM rewriting.
//!
//! Each component fans out into one unit per document it owns: the single
//! image, or the index plus every child. All units of all components run
//! cooperatively on the current task and are joined at a single barrier;
//! a failing unit is reported without cancelling its siblings.

use super::output::write_document;
use super::report::{RunReport, UnitKind, UnitOutcome};
use crate::error::{ErrorContext, Result, SbomError};
use crate::handlers::SbomHandler;
use crate::model::{make_reference, Component, Digest, ResolvedImage, Snapshot};
use crate::registry::SbomSource;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Downloads, rewrites and stores the SBOMs of a snapshot.
#[derive(Debug)]
pub struct SbomUpdater<S> {
    source: S,
    destination: PathBuf,
}

impl<S: SbomSource> SbomUpdater<S> {
    pub fn new(source: S, destination: impl Into<PathBuf>) -> Self {
        Self {
            source,
            destination: destination.into(),
        }
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Process every unit of every component and report each outcome.
    pub async fn update_sboms(&self, snapshot: &Snapshot) -> RunReport {
        let claims = claim_digests(snapshot);
        tracing::info!(
            "Updating {} SBOM(s) for {} component(s)",
            snapshot.unit_count(),
            snapshot.components.len()
        );

        let per_component = join_all(
            snapshot
                .components
                .iter()
                .enumerate()
                .map(|(index, component)| self.update_component_sboms(index, component, &claims)),
        )
        .await;

        RunReport::new(per_component.into_iter().flatten().collect())
    }

    async fn update_component_sboms(
        &self,
        component_index: usize,
        component: &Component,
        claims: &HashMap<Digest, usize>,
    ) -> Vec<UnitOutcome> {
        let units = component.image.units();
        join_all(units.iter().map(|image| async move {
            let reference = make_reference(&component.repository, image.digest());
            let kind = if image.is_index() {
                UnitKind::Index
            } else {
                UnitKind::Image
            };

            let result = match claims.get(image.digest()) {
                Some(&owner) if owner != component_index => Err(SbomError::validation(format!(
                    "digest {} is already released by component {owner}",
                    image.digest()
                ))),
                _ => self.update_sbom(component, image).await,
            };

            match result {
                Ok(path) => UnitOutcome::updated(reference, kind, path),
                Err(err) => {
                    tracing::error!("Failed to update SBOM for {}: {}", reference, err);
                    UnitOutcome::failed(reference, kind, &err)
                }
            }
        }))
        .await
    }

    /// Download, rewrite and store the SBOM of one image.
    pub async fn update_sbom(&self, component: &Component, image: &ResolvedImage) -> Result<PathBuf> {
        let reference = make_reference(&component.repository, image.digest());

        let raw = self.source.download_sbom(&reference).await?;
        let mut document: Value = serde_json::from_slice(&raw)
            .with_context(|| format!("SBOM for {reference}"))?;

        let handler = SbomHandler::for_document(&document, &reference)?;
        tracing::debug!("Rewriting {} SBOM for {}", handler.name(), reference);
        handler.update_document(component, image, &mut document)?;

        let path = write_document(&self.destination, image.digest(), &document).await?;
        tracing::info!("Updated SBOM for {} written to {}", reference, path.display());
        Ok(path)
    }
}

/// Map every unit digest to the first component that owns it.
///
/// Output files are keyed by digest, so a digest reached from two
/// components may only be written once.
fn claim_digests(snapshot: &Snapshot) -> HashMap<Digest, usize> {
    let mut claims = HashMap::new();
    for (index, component) in snapshot.components.iter().enumerate() {
        for unit in component.image.units() {
            claims.entry(unit.digest().clone()).or_insert(index);
        }
    }
    claims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Image, IndexImage};

    fn digest(hex: &str) -> Digest {
        Digest::parse(&format!("sha256:{hex}")).expect("valid digest")
    }

    #[test]
    fn test_first_component_claims_shared_digest() {
        let shared = ResolvedImage::Image(Image::new(digest("aa")));
        let snapshot = Snapshot::new(vec![
            Component::new("r.io/a".to_string(), shared.clone(), vec![]),
            Component::new(
                "r.io/b".to_string(),
                ResolvedImage::Index(IndexImage::new(
                    digest("bb"),
                    vec![Image::new(digest("aa")), Image::new(digest("cc"))],
                )),
                vec![],
            ),
        ]);

        let claims = claim_digests(&snapshot);
        assert_eq!(claims[&digest("aa")], 0);
        assert_eq!(claims[&digest("bb")], 1);
        assert_eq!(claims[&digest("cc")], 1);
    }
}
