use serde::Serialize;
use stevedore_core::{
    CertificateBind, EnvironmentResolver, ImageCandidate, Scheme, plan_port_bindings,
};
use stevedore_engine::{ContainerEngine, ImageInspector};

use crate::core_services::{BASKET_API, CATALOG_API, IDENTITY_API, ORDERING_API, uses_event_bus};
use crate::topology::{BindMount, Endpoint, NodeKind, ServiceNode, Topology, TopologyError};

/// A locally built store image that can join the topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredService {
    pub name: String,
    pub image_tag: String,
    pub image_id: String,
    pub http_port: u16,
    pub https_port: u16,
    pub site_domain: Option<String>,
    pub callback_url: String,
    pub exposed_ports: Vec<String>,
}

impl DiscoveredService {
    fn node(&self, certificate: &CertificateBind) -> ServiceNode {
        let mut http = Endpoint::new(Scheme::Http, self.http_port);
        http.target_port = Some(self.http_port);
        let mut https = Endpoint::new(Scheme::Https, self.https_port);
        https.target_port = Some(self.https_port);

        ServiceNode::new(
            &self.name,
            NodeKind::Container {
                image: self.image_tag.clone(),
            },
        )
        .with_endpoint(http)
        .with_endpoint(https)
        .with_external_endpoints()
        .with_bind_mount(BindMount::from(certificate))
    }
}

/// Topology name for an image tag: the repository part, with `/` and any
/// registry port `:` turned into `-`.
pub fn service_name(tag: &str) -> String {
    let repository = tag.rsplit_once(':').map_or(tag, |(repo, _)| repo);
    repository.replace(['/', ':'], "-")
}

/// Inspect every local `:<marker>` image and keep those exposing both ports.
///
/// Failures are isolated per image: a bad image is logged and skipped, and a
/// failed listing yields no services at all.
pub async fn discover_services<E: ContainerEngine>(
    inspector: &ImageInspector<E>,
    resolver: &EnvironmentResolver,
    marker: &str,
) -> Vec<DiscoveredService> {
    let marked = match inspector.list_marked(marker).await {
        Ok(marked) => marked,
        Err(e) => {
            tracing::warn!(marker, error = %e, "image listing failed, no services discovered");
            return Vec::new();
        }
    };

    let mut services = Vec::new();
    for (candidate, tag) in &marked {
        if let Some(service) = discover_one(inspector, resolver, candidate, tag).await {
            services.push(service);
        }
    }

    tracing::info!(
        marker,
        candidates = marked.len(),
        discovered = services.len(),
        "discovery finished"
    );
    services
}

async fn discover_one<E: ContainerEngine>(
    inspector: &ImageInspector<E>,
    resolver: &EnvironmentResolver,
    candidate: &ImageCandidate,
    tag: &str,
) -> Option<DiscoveredService> {
    let metadata = match inspector.inspect_candidate(tag, candidate).await {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(tag, error = %e, "skipping image");
            return None;
        }
    };

    let env = resolver.resolve(&metadata.declared_env);
    if !env.has_both_ports() {
        tracing::warn!(
            tag,
            http_port = %env.http_port,
            https_port = %env.https_port,
            "image does not declare both ports, skipping"
        );
        return None;
    }

    let (Ok(http_port), Ok(https_port)) = (
        env.http_port.trim().parse::<u16>(),
        env.https_port.trim().parse::<u16>(),
    ) else {
        tracing::warn!(
            tag,
            http_port = %env.http_port,
            https_port = %env.https_port,
            "image declares ports that are not valid port numbers, skipping"
        );
        return None;
    };

    let plan = plan_port_bindings(&env);
    tracing::debug!(tag, http_port, https_port, "discovered service");

    Some(DiscoveredService {
        name: service_name(tag),
        image_tag: tag.to_owned(),
        image_id: metadata.image_id,
        http_port,
        https_port,
        site_domain: env.site_domain.clone(),
        callback_url: env.callback_url.clone(),
        exposed_ports: plan.exposed_ports,
    })
}

/// Add discovered services to a topology that already holds the core set.
///
/// Nodes are registered first, then their outgoing edges, then the identity
/// patch pointing back at each of them. A name already taken is skipped with
/// a warning. Returns the names actually registered.
pub fn register(
    topology: &mut Topology,
    services: &[DiscoveredService],
    profile: Scheme,
    certificate: &CertificateBind,
) -> Result<Vec<String>, TopologyError> {
    let launch = profile.as_str();
    let mut registered = Vec::new();

    for service in services {
        match topology.add_node(service.node(certificate)) {
            Ok(()) => registered.push(service.name.clone()),
            // arch-lint: allow(no-error-swallowing) reason="a colliding store is reported and left out, the rest still register"
            Err(TopologyError::DuplicateNode { name }) => {
                tracing::warn!(service = %name, tag = %service.image_tag, "name already registered, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    for name in &registered {
        for core in [BASKET_API, CATALOG_API, ORDERING_API] {
            topology.add_reference(name, core)?;
        }
        uses_event_bus(topology, name)?;
        topology.set_endpoint_env(name, "IdentityUrl", IDENTITY_API, launch)?;
        topology.set_endpoint_env(name, "CallBackUrl", name, launch)?;
    }

    for name in &registered {
        topology.set_endpoint_env(IDENTITY_API, &format!("StoreClients__{name}"), name, launch)?;
    }

    Ok(registered)
}
