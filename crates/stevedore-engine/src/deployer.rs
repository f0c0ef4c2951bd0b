use std::sync::Arc;
use std::time::Duration;

use stevedore_core::{
    CertificateBind, ContainerSpec, EnvironmentResolver, SelectionPolicy, plan_port_bindings,
    strip_marker,
};

use crate::engine::{ContainerEngine, bounded};
use crate::error::{DeployError, InspectError};
use crate::inspector::ImageInspector;

/// Creates and starts containers; the only component that calls the
/// engine's create, start, and remove operations.
pub struct ContainerDeployer<E: ContainerEngine> {
    engine: Arc<E>,
    inspector: ImageInspector<E>,
    resolver: EnvironmentResolver,
    certificate: CertificateBind,
    marker: String,
    timeout: Duration,
}

impl<E: ContainerEngine> ContainerDeployer<E> {
    pub fn new(
        engine: Arc<E>,
        resolver: EnvironmentResolver,
        certificate: CertificateBind,
        marker: &str,
        policy: SelectionPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            inspector: ImageInspector::new(Arc::clone(&engine), policy, timeout),
            engine,
            resolver,
            certificate,
            marker: marker.to_owned(),
            timeout,
        }
    }

    /// Deploy one container from `image_tag` and return its id.
    ///
    /// Inspection filters by the full tag; the container is created from
    /// [`ContainerSpec::image`], the tag with its `:<marker>` suffix removed.
    /// No readiness check follows the start.
    pub async fn deploy(&self, image_tag: &str, container_name: &str) -> Result<String, DeployError> {
        tracing::info!(container = %container_name, tag = %image_tag, "deploying container");

        match self.plan_and_run(image_tag, container_name).await {
            Ok(id) => {
                tracing::info!(container = %container_name, id = %id, "container deployed");
                Ok(id)
            }
            Err(e) => {
                tracing::error!(
                    container = %container_name,
                    tag = %image_tag,
                    error = %e,
                    "deployment failed"
                );
                Err(e)
            }
        }
    }

    /// Assemble the create request without touching create/start.
    pub async fn plan(&self, image_tag: &str, container_name: &str) -> Result<ContainerSpec, DeployError> {
        let metadata = self
            .inspector
            .inspect(image_tag)
            .await
            .map_err(|e| match e {
                InspectError::NotFound { .. } => DeployError::ImageNotFound {
                    tag: image_tag.to_owned(),
                },
                other => DeployError::Inspect {
                    tag: image_tag.to_owned(),
                    source: other,
                },
            })?;

        let env = self.resolver.resolve(&metadata.declared_env);
        let ports = plan_port_bindings(&env);

        Ok(ContainerSpec::new(
            &strip_marker(image_tag, &self.marker),
            container_name,
            &env,
            ports,
            self.certificate.clone(),
        ))
    }

    async fn plan_and_run(&self, image_tag: &str, container_name: &str) -> Result<String, DeployError> {
        let spec = self.plan(image_tag, container_name).await?;
        tracing::debug!(?spec, "container spec assembled");
        self.create_and_start(&spec).await
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, DeployError> {
        tracing::info!(container = %spec.name, image = %spec.image, "creating container");

        let id = bounded(
            "create container",
            self.timeout,
            self.engine.create_container(spec),
        )
        .await
        .map_err(|e| DeployError::Create {
            name: spec.name.clone(),
            image: spec.image.clone(),
            source: e,
        })?;

        if let Err(start_err) =
            bounded("start container", self.timeout, self.engine.start_container(&id)).await
        {
            let cleaned_up = self.remove_orphan(&spec.name, &id).await;
            return Err(DeployError::PartialDeployment {
                name: spec.name.clone(),
                container_id: id,
                cleaned_up,
                source: start_err,
            });
        }

        Ok(id)
    }

    /// Best-effort removal of a container that was created but never started.
    async fn remove_orphan(&self, container_name: &str, id: &str) -> bool {
        match bounded("remove container", self.timeout, self.engine.remove_container(id)).await {
            Ok(()) => {
                tracing::warn!(container = %container_name, id = %id, "removed container that failed to start");
                true
            }
            Err(e) => {
                tracing::warn!(
                    container = %container_name,
                    id = %id,
                    error = %e,
                    "could not remove container that failed to start"
                );
                false
            }
        }
    }
}
