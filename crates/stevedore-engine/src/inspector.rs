use std::sync::Arc;
use std::time::Duration;

use stevedore_core::{ImageCandidate, ImageMetadata, SelectionPolicy};

use crate::engine::{ContainerEngine, bounded};
use crate::error::InspectError;

/// Read-only queries against the local image store.
pub struct ImageInspector<E: ContainerEngine> {
    engine: Arc<E>,
    policy: SelectionPolicy,
    timeout: Duration,
}

impl<E: ContainerEngine> ImageInspector<E> {
    pub fn new(engine: Arc<E>, policy: SelectionPolicy, timeout: Duration) -> Self {
        Self {
            engine,
            policy,
            timeout,
        }
    }

    /// Find the image matching `reference` and return its declared env.
    ///
    /// When several images match, the selection policy decides which one is read.
    pub async fn inspect(&self, reference: &str) -> Result<ImageMetadata, InspectError> {
        let candidates = bounded(
            "find images",
            self.timeout,
            self.engine.find_images(reference),
        )
        .await
        .map_err(|e| InspectError::Engine {
            reference: reference.to_owned(),
            source: e,
        })?;

        let chosen = self
            .policy
            .select(&candidates)
            .ok_or_else(|| InspectError::NotFound {
                reference: reference.to_owned(),
            })?;

        if candidates.len() > 1 {
            tracing::debug!(
                reference,
                matches = candidates.len(),
                chosen = %chosen.id,
                policy = ?self.policy,
                "several images match, selected one"
            );
        }

        self.inspect_candidate(reference, chosen).await
    }

    /// Inspect one listed image.
    pub async fn inspect_candidate(
        &self,
        reference: &str,
        candidate: &ImageCandidate,
    ) -> Result<ImageMetadata, InspectError> {
        let details = bounded(
            "inspect image",
            self.timeout,
            self.engine.inspect_image(&candidate.id),
        )
        .await
        .map_err(|e| InspectError::Engine {
            reference: reference.to_owned(),
            source: e,
        })?;

        ImageMetadata::from_inspection(&details.id, &details.env, details.repo_tags).map_err(
            |e| InspectError::Malformed {
                reference: reference.to_owned(),
                source: e,
            },
        )
    }

    /// Every local image carrying a `:<marker>` tag, paired with that tag.
    pub async fn list_marked(
        &self,
        marker: &str,
    ) -> Result<Vec<(ImageCandidate, String)>, InspectError> {
        let images = bounded("list images", self.timeout, self.engine.list_images())
            .await
            .map_err(|e| InspectError::Engine {
                reference: format!("*:{marker}"),
                source: e,
            })?;

        Ok(images
            .into_iter()
            .filter_map(|image| {
                let tag = image.matching_tag(marker)?.to_owned();
                Some((image, tag))
            })
            .collect())
    }
}
