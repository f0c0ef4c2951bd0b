use stevedore_core::BuildCompletionEvent;
use uuid::Uuid;

use crate::deployer::ContainerDeployer;
use crate::engine::ContainerEngine;
use crate::error::DeployError;

/// Receives one delivered integration event.
///
/// Delivery is at least once; a returned error is left to the bus's own
/// retry and dead-letter handling.
#[allow(async_fn_in_trait)]
pub trait IntegrationEventHandler<Event> {
    type Output;
    type Error;

    async fn handle(&self, event: &Event) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Deployed { name: String, container_id: String },
    Skipped { reason: String },
}

/// Turns build-completion events into freshly named containers.
///
/// Every event yields a new container; earlier containers of the same tag
/// are never stopped or replaced.
pub struct DeploymentTrigger<E: ContainerEngine> {
    deployer: ContainerDeployer<E>,
}

impl<E: ContainerEngine> DeploymentTrigger<E> {
    pub fn new(deployer: ContainerDeployer<E>) -> Self {
        Self { deployer }
    }
}

impl<E: ContainerEngine> IntegrationEventHandler<BuildCompletionEvent> for DeploymentTrigger<E> {
    type Output = TriggerOutcome;
    type Error = DeployError;

    async fn handle(&self, event: &BuildCompletionEvent) -> Result<TriggerOutcome, DeployError> {
        tracing::info!(
            event_id = event.id.as_deref().unwrap_or("-"),
            tag = %event.docker_tag,
            project = %event.project_name,
            "handling build completion event"
        );

        if event.docker_tag.trim().is_empty() {
            tracing::warn!(project = %event.project_name, "event carries no image tag, skipping");
            return Ok(TriggerOutcome::Skipped {
                reason: "empty image tag".to_owned(),
            });
        }

        let name = container_name_for(&event.docker_tag);
        match self.deployer.deploy(&event.docker_tag, &name).await {
            Ok(container_id) => Ok(TriggerOutcome::Deployed { name, container_id }),
            Err(DeployError::ImageNotFound { tag }) => {
                tracing::warn!(tag = %tag, "image not available yet, skipping event");
                Ok(TriggerOutcome::Skipped {
                    reason: format!("no local image matches {tag}"),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// `<tag with ':' replaced by '_'>_<uuid v4>`.
///
/// Characters the engine rejects in container names (such as the `/` of a
/// repository path) are replaced by `_` as well.
pub fn container_name_for(image_tag: &str) -> String {
    let base: String = image_tag
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{base}_{}", Uuid::new_v4())
}
