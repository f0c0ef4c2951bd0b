use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, ImageInspect, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, ListImagesOptions, RemoveContainerOptions, StartContainerOptions,
};
use stevedore_core::{ContainerSpec, EngineConfig, ImageCandidate};

use crate::error::EngineError;

/// Raw inspection result for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDetails {
    pub id: String,
    /// Declared `KEY=VALUE` entries, unparsed
    pub env: Vec<String>,
    pub repo_tags: Vec<String>,
}

/// Abstraction over the container engine for testability.
///
/// Production code uses [`DockerEngine`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ContainerEngine: Send + Sync {
    /// Check that the engine answers.
    async fn ping(&self) -> Result<(), EngineError>;

    /// List every local image, intermediate layers included.
    async fn list_images(&self) -> Result<Vec<ImageCandidate>, EngineError>;

    /// List local images matching a `reference` filter (e.g. `myapp:stores`).
    async fn find_images(&self, reference: &str) -> Result<Vec<ImageCandidate>, EngineError>;

    async fn inspect_image(&self, id: &str) -> Result<ImageDetails, EngineError>;

    /// Create a container and return its id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Force-remove a container, running or not.
    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;
}

/// Docker engine reached over its local socket.
pub struct DockerEngine {
    docker: Docker,
}

impl std::fmt::Debug for DockerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerEngine").finish_non_exhaustive()
    }
}

impl DockerEngine {
    /// Connect to the configured socket, or the platform default when none is set.
    pub fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        let docker = match &config.socket {
            Some(socket) => Docker::connect_with_unix(
                &socket.to_string_lossy(),
                config.timeout_secs,
                bollard::API_DEFAULT_VERSION,
            ),
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| EngineError::Connect { source: e })?;

        Ok(Self { docker })
    }
}

impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.docker.ping().await.map_err(request_error("ping"))?;
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageCandidate>, EngineError> {
        let options = ListImagesOptions {
            all: true,
            ..Default::default()
        };
        let images = self
            .docker
            .list_images(Some(options))
            .await
            .map_err(request_error("list images"))?;

        Ok(images.into_iter().map(to_candidate).collect())
    }

    async fn find_images(&self, reference: &str) -> Result<Vec<ImageCandidate>, EngineError> {
        let options = ListImagesOptions {
            filters: Some(HashMap::from([(
                "reference".to_owned(),
                vec![reference.to_owned()],
            )])),
            ..Default::default()
        };
        let images = self
            .docker
            .list_images(Some(options))
            .await
            .map_err(request_error("find images"))?;

        Ok(images.into_iter().map(to_candidate).collect())
    }

    async fn inspect_image(&self, id: &str) -> Result<ImageDetails, EngineError> {
        let image = self
            .docker
            .inspect_image(id)
            .await
            .map_err(request_error("inspect image"))?;

        Ok(to_details(id, image))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let body = create_body(spec);
        let options = CreateContainerOptions {
            name: Some(spec.name.clone()),
            platform: String::new(),
        };

        let response = self
            .docker
            .create_container(Some(options), body)
            .await
            .map_err(request_error("create container"))?;

        for warning in &response.warnings {
            tracing::warn!(container = %spec.name, %warning, "engine warning on create");
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(request_error("start container"))
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(request_error("remove container"))
    }
}

/// Run one engine call under `budget`.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    budget: Duration,
    call: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    tokio::time::timeout(budget, call)
        .await
        // arch-lint: allow(no-error-swallowing) reason="Elapsed carries nothing beyond the budget, which is reported"
        .map_err(|_elapsed| EngineError::Timeout {
            operation,
            after: budget,
        })?
}

/// Create request for `spec`: env, both container ports, host bindings and
/// the certificate bind. A binding without a host port is left for the engine
/// to assign.
pub(crate) fn create_body(spec: &ContainerSpec) -> ContainerCreateBody {
    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = spec
        .port_bindings
        .iter()
        .map(|(container_port, host_port)| {
            let binding = PortBinding {
                host_ip: None,
                host_port: host_port.clone(),
            };
            (container_port.clone(), Some(vec![binding]))
        })
        .collect();

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        env: Some(spec.env.clone()),
        exposed_ports: Some(spec.exposed_ports.clone()),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            binds: Some(vec![spec.certificate.to_bind()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn to_details(requested_id: &str, image: ImageInspect) -> ImageDetails {
    ImageDetails {
        // arch-lint: allow(no-silent-result-drop) reason="the engine omits the id only when it echoes the requested one"
        id: image.id.unwrap_or_else(|| requested_id.to_owned()),
        // arch-lint: allow(no-silent-result-drop) reason="an image without config declares no env"
        env: image.config.and_then(|c| c.env).unwrap_or_default(),
        // arch-lint: allow(no-silent-result-drop) reason="untagged images carry no repo tags"
        repo_tags: image.repo_tags.unwrap_or_default(),
    }
}

fn to_candidate(image: bollard::models::ImageSummary) -> ImageCandidate {
    ImageCandidate {
        id: image.id,
        repo_tags: image.repo_tags,
        created: image.created,
    }
}

fn request_error(operation: &'static str) -> impl FnOnce(bollard::errors::Error) -> EngineError {
    move |e| match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Daemon {
            operation,
            status: status_code,
            message,
        },
        other => EngineError::Transport {
            operation,
            source: other,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use stevedore_core::CertificateBind;

    use super::*;

    fn spec(http: Option<&str>, https: Option<&str>) -> ContainerSpec {
        ContainerSpec {
            image: "store-a".to_owned(),
            name: "store-a_stores_1".to_owned(),
            env: vec!["HTTP_PORT=8080".to_owned(), "CallBackUrl=https://localhost:8443".to_owned()],
            exposed_ports: vec!["80/tcp".to_owned(), "443/tcp".to_owned()],
            port_bindings: BTreeMap::from([
                ("80/tcp".to_owned(), http.map(str::to_owned)),
                ("443/tcp".to_owned(), https.map(str::to_owned)),
            ]),
            certificate: CertificateBind::read_only(
                Path::new("./certs/"),
                "/https/",
                Path::new("/srv/stevedore"),
            ),
        }
    }

    fn host_ports(body: &ContainerCreateBody, container_port: &str) -> Vec<Option<String>> {
        let bindings = body
            .host_config
            .as_ref()
            .and_then(|h| h.port_bindings.as_ref())
            .and_then(|b| b.get(container_port).cloned())
            .flatten()
            .unwrap();
        bindings.into_iter().map(|b| b.host_port).collect()
    }

    #[test]
    fn body_carries_image_env_and_ports() {
        let body = create_body(&spec(Some("8080"), Some("8443")));

        assert_eq!(body.image.as_deref(), Some("store-a"));
        assert_eq!(body.env.as_ref().unwrap().len(), 2);
        assert_eq!(
            body.exposed_ports,
            Some(vec!["80/tcp".to_owned(), "443/tcp".to_owned()])
        );
        assert_eq!(host_ports(&body, "80/tcp"), vec![Some("8080".to_owned())]);
        assert_eq!(host_ports(&body, "443/tcp"), vec![Some("8443".to_owned())]);
    }

    #[test]
    fn unset_host_port_is_left_to_engine() {
        let body = create_body(&spec(None, Some("8443")));

        let bindings = body.host_config.unwrap().port_bindings.unwrap();
        let http = bindings["80/tcp"].clone().unwrap();
        assert_eq!(http.len(), 1);
        assert_eq!(http[0].host_ip, None);
        assert_eq!(http[0].host_port, None);
        assert_eq!(
            bindings["443/tcp"].clone().unwrap()[0].host_port.as_deref(),
            Some("8443")
        );
    }

    #[test]
    fn certificate_is_bound_read_only() {
        let body = create_body(&spec(None, None));

        let binds = body.host_config.unwrap().binds.unwrap();
        assert_eq!(binds, vec!["/srv/stevedore/./certs/:/https/:ro".to_owned()]);
    }

    #[test]
    fn inspection_without_config_has_no_env() {
        let details = to_details("sha256:x", ImageInspect::default());

        assert_eq!(details.id, "sha256:x");
        assert!(details.env.is_empty());
        assert!(details.repo_tags.is_empty());
    }

    #[test]
    fn inspection_reads_config_env() {
        let image: ImageInspect = serde_json::from_value(serde_json::json!({
            "Id": "sha256:y",
            "RepoTags": ["shop:stores"],
            "Config": { "Env": ["HTTP_PORT=80"] }
        }))
        .unwrap();

        let details = to_details("shop:stores", image);
        assert_eq!(details.id, "sha256:y");
        assert_eq!(details.env, vec!["HTTP_PORT=80"]);
        assert_eq!(details.repo_tags, vec!["shop:stores"]);
    }
}
