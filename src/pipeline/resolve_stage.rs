//! Concurrent snapshot resolution.

use super::report::{UnitKind, UnitOutcome};
use crate::model::{Component, ComponentRequest, Snapshot};
use crate::registry::{ManifestResolver, ManifestSource};
use futures::future::join_all;

/// The resolved snapshot plus the components that could not be resolved.
#[derive(Debug, Clone, Default)]
pub struct SnapshotResolution {
    pub snapshot: Snapshot,
    pub failures: Vec<UnitOutcome>,
}

/// Resolve every requested component concurrently.
///
/// A component whose manifest cannot be fetched or classified becomes a
/// failed outcome; the remaining components are still resolved.
pub async fn resolve_snapshot<M: ManifestSource>(
    resolver: &ManifestResolver<M>,
    requests: &[ComponentRequest],
) -> SnapshotResolution {
    let results = join_all(requests.iter().map(|request| async move {
        let result = resolver.resolve(&request.repository, &request.digest).await;
        (request, result)
    }))
    .await;

    let mut resolution = SnapshotResolution::default();
    for (request, result) in results {
        match result {
            Ok(image) => {
                tracing::info!(
                    "Resolved {} as {}",
                    request.reference(),
                    image.kind_name()
                );
                resolution.snapshot.components.push(Component::new(
                    request.repository.clone(),
                    image,
                    request.tags.clone(),
                ));
            }
            Err(err) => {
                tracing::error!("Failed to resolve {}: {}", request.reference(), err);
                resolution.failures.push(UnitOutcome::failed(
                    request.reference(),
                    UnitKind::Component,
                    &err,
                ));
            }
        }
    }

    resolution
}
