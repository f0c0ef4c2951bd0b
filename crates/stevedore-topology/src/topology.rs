use std::collections::BTreeMap;

use serde::Serialize;
use stevedore_core::{CertificateBind, Scheme};

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("service '{name}' is already registered")]
    DuplicateNode { name: String },

    #[error("unknown service '{name}'")]
    UnknownNode { name: String },

    #[error("service '{service}' has no endpoint named '{endpoint}'")]
    UnknownEndpoint { service: String, endpoint: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Backing resource consumed through a connection string.
    Infrastructure { connection_string: String },
    /// Service built from source in this application.
    Project,
    /// Service run from a prebuilt image.
    Container { image: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub name: String,
    pub scheme: Scheme,
    pub port: u16,
    pub target_port: Option<u16>,
    pub external: bool,
}

impl Endpoint {
    /// Endpoint named after its scheme (`http` / `https`).
    pub fn new(scheme: Scheme, port: u16) -> Self {
        Self {
            name: scheme.as_str().to_owned(),
            scheme,
            port,
            target_port: None,
            external: false,
        }
    }

    pub fn url(&self) -> String {
        format!("{}://localhost:{}", self.scheme, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvValue {
    Literal { value: String },
    /// URL of another node's endpoint, resolved once the topology is complete.
    Endpoint { service: String, endpoint: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindMount {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl From<&CertificateBind> for BindMount {
    fn from(bind: &CertificateBind) -> Self {
        Self {
            source: bind.host_path.display().to_string(),
            target: bind.container_path.clone(),
            read_only: bind.read_only,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceNode {
    pub name: String,
    pub kind: NodeKind,
    pub endpoints: Vec<Endpoint>,
    pub environment: BTreeMap<String, EnvValue>,
    pub references: Vec<String>,
    pub wait_for: Vec<String>,
    pub bind_mounts: Vec<BindMount>,
}

impl ServiceNode {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            endpoints: Vec::new(),
            environment: BTreeMap::new(),
            references: Vec::new(),
            wait_for: Vec::new(),
            bind_mounts: Vec::new(),
        }
    }

    pub fn project(name: &str) -> Self {
        Self::new(name, NodeKind::Project)
    }

    pub fn infrastructure(name: &str, connection_string: &str) -> Self {
        Self::new(
            name,
            NodeKind::Infrastructure {
                connection_string: connection_string.to_owned(),
            },
        )
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Mark every endpoint as reachable from outside the host network.
    pub fn with_external_endpoints(mut self) -> Self {
        for endpoint in &mut self.endpoints {
            endpoint.external = true;
        }
        self
    }

    pub fn with_bind_mount(mut self, mount: BindMount) -> Self {
        self.bind_mounts.push(mount);
        self
    }

    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

/// A node with every reference and endpoint value turned into plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNode {
    pub name: String,
    pub kind: NodeKind,
    pub endpoints: Vec<Endpoint>,
    pub environment: BTreeMap<String, String>,
    pub wait_for: Vec<String>,
    pub bind_mounts: Vec<BindMount>,
}

/// Mutable registry of services and the one-directional edges between them.
///
/// Edges are plain names, so cycles (identity pointing back at every client)
/// are expressed by registering every node first and patching edges after.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<String, ServiceNode>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: ServiceNode) -> Result<(), TopologyError> {
        if self.nodes.contains_key(&node.name) {
            return Err(TopologyError::DuplicateNode { name: node.name });
        }
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&ServiceNode> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ServiceNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `from` consumes `to`: its endpoints or connection string.
    pub fn add_reference(&mut self, from: &str, to: &str) -> Result<(), TopologyError> {
        self.require(to)?;
        let node = self.node_mut(from)?;
        if !node.references.iter().any(|r| r == to) {
            node.references.push(to.to_owned());
        }
        Ok(())
    }

    /// `from` must not start before `to`.
    pub fn add_wait_for(&mut self, from: &str, to: &str) -> Result<(), TopologyError> {
        self.require(to)?;
        let node = self.node_mut(from)?;
        if !node.wait_for.iter().any(|w| w == to) {
            node.wait_for.push(to.to_owned());
        }
        Ok(())
    }

    pub fn set_env(&mut self, node: &str, key: &str, value: &str) -> Result<(), TopologyError> {
        self.node_mut(node)?.environment.insert(
            key.to_owned(),
            EnvValue::Literal {
                value: value.to_owned(),
            },
        );
        Ok(())
    }

    /// Set `key` on `node` to the URL of `service`'s `endpoint`.
    pub fn set_endpoint_env(
        &mut self,
        node: &str,
        key: &str,
        service: &str,
        endpoint: &str,
    ) -> Result<(), TopologyError> {
        self.endpoint_url(service, endpoint)?;
        self.node_mut(node)?.environment.insert(
            key.to_owned(),
            EnvValue::Endpoint {
                service: service.to_owned(),
                endpoint: endpoint.to_owned(),
            },
        );
        Ok(())
    }

    pub fn endpoint_url(&self, service: &str, endpoint: &str) -> Result<String, TopologyError> {
        let node = self.require(service)?;
        node.endpoint(endpoint)
            .map(Endpoint::url)
            .ok_or_else(|| TopologyError::UnknownEndpoint {
                service: service.to_owned(),
                endpoint: endpoint.to_owned(),
            })
    }

    /// Final environment of `name`: variables injected by references first,
    /// then the node's own entries, which win on conflict.
    pub fn resolved_environment(
        &self,
        name: &str,
    ) -> Result<BTreeMap<String, String>, TopologyError> {
        let node = self.require(name)?;
        let mut env = BTreeMap::new();

        for reference in &node.references {
            let target = self.require(reference)?;
            match &target.kind {
                NodeKind::Infrastructure { connection_string } => {
                    env.insert(
                        format!("ConnectionStrings__{reference}"),
                        connection_string.clone(),
                    );
                }
                NodeKind::Project | NodeKind::Container { .. } => {
                    for endpoint in &target.endpoints {
                        env.insert(
                            format!("services__{reference}__{}__0", endpoint.name),
                            endpoint.url(),
                        );
                    }
                }
            }
        }

        for (key, value) in &node.environment {
            let text = match value {
                EnvValue::Literal { value } => value.clone(),
                EnvValue::Endpoint { service, endpoint } => self.endpoint_url(service, endpoint)?,
            };
            env.insert(key.clone(), text);
        }

        Ok(env)
    }

    /// Every node with its environment resolved, in name order.
    pub fn resolve(&self) -> Result<Vec<ResolvedNode>, TopologyError> {
        self.nodes
            .values()
            .map(|node| {
                Ok(ResolvedNode {
                    name: node.name.clone(),
                    kind: node.kind.clone(),
                    endpoints: node.endpoints.clone(),
                    environment: self.resolved_environment(&node.name)?,
                    wait_for: node.wait_for.clone(),
                    bind_mounts: node.bind_mounts.clone(),
                })
            })
            .collect()
    }

    fn require(&self, name: &str) -> Result<&ServiceNode, TopologyError> {
        self.nodes.get(name).ok_or_else(|| TopologyError::UnknownNode {
            name: name.to_owned(),
        })
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut ServiceNode, TopologyError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| TopologyError::UnknownNode {
                name: name.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(name: &str, http: u16, https: u16) -> ServiceNode {
        ServiceNode::project(name)
            .with_endpoint(Endpoint::new(Scheme::Http, http))
            .with_endpoint(Endpoint::new(Scheme::Https, https))
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut topology = Topology::new();
        topology.add_node(ServiceNode::project("a")).unwrap();

        let err = topology.add_node(ServiceNode::project("a")).unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateNode { ref name } if name == "a"));
    }

    #[test]
    fn references_to_unknown_nodes_fail() {
        let mut topology = Topology::new();
        topology.add_node(ServiceNode::project("a")).unwrap();

        assert!(topology.add_reference("a", "ghost").is_err());
        assert!(topology.add_reference("ghost", "a").is_err());
    }

    #[test]
    fn service_reference_injects_endpoint_urls() {
        let mut topology = Topology::new();
        topology.add_node(web("catalog-api", 5222, 7222)).unwrap();
        topology.add_node(ServiceNode::project("webapp")).unwrap();
        topology.add_reference("webapp", "catalog-api").unwrap();

        let env = topology.resolved_environment("webapp").unwrap();
        assert_eq!(env["services__catalog-api__http__0"], "http://localhost:5222");
        assert_eq!(env["services__catalog-api__https__0"], "https://localhost:7222");
    }

    #[test]
    fn infrastructure_reference_injects_connection_string() {
        let mut topology = Topology::new();
        topology
            .add_node(ServiceNode::infrastructure("eventbus", "amqp://localhost:5672"))
            .unwrap();
        topology.add_node(ServiceNode::project("basket-api")).unwrap();
        topology.add_reference("basket-api", "eventbus").unwrap();

        let env = topology.resolved_environment("basket-api").unwrap();
        assert_eq!(env["ConnectionStrings__eventbus"], "amqp://localhost:5672");
    }

    #[test]
    fn repeated_reference_is_recorded_once() {
        let mut topology = Topology::new();
        topology.add_node(ServiceNode::project("a")).unwrap();
        topology.add_node(ServiceNode::project("b")).unwrap();
        topology.add_reference("a", "b").unwrap();
        topology.add_reference("a", "b").unwrap();
        topology.add_wait_for("a", "b").unwrap();
        topology.add_wait_for("a", "b").unwrap();

        let node = topology.node("a").unwrap();
        assert_eq!(node.references, vec!["b"]);
        assert_eq!(node.wait_for, vec!["b"]);
    }

    #[test]
    fn cyclic_endpoint_env_resolves() {
        let mut topology = Topology::new();
        topology.add_node(web("identity-api", 5223, 5243)).unwrap();
        topology.add_node(web("webapp", 5045, 7298)).unwrap();

        topology
            .set_endpoint_env("webapp", "IdentityUrl", "identity-api", "https")
            .unwrap();
        topology
            .set_endpoint_env("identity-api", "WebAppClient", "webapp", "https")
            .unwrap();

        assert_eq!(
            topology.resolved_environment("webapp").unwrap()["IdentityUrl"],
            "https://localhost:5243"
        );
        assert_eq!(
            topology.resolved_environment("identity-api").unwrap()["WebAppClient"],
            "https://localhost:7298"
        );
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut topology = Topology::new();
        topology.add_node(ServiceNode::project("worker")).unwrap();
        topology.add_node(ServiceNode::project("webapp")).unwrap();

        let err = topology
            .set_endpoint_env("webapp", "X", "worker", "http")
            .unwrap_err();
        assert!(matches!(err, TopologyError::UnknownEndpoint { .. }));
    }

    #[test]
    fn own_env_overrides_reference_env() {
        let mut topology = Topology::new();
        topology
            .add_node(ServiceNode::infrastructure("redis", "localhost:6379"))
            .unwrap();
        topology.add_node(ServiceNode::project("basket-api")).unwrap();
        topology.add_reference("basket-api", "redis").unwrap();
        topology
            .set_env("basket-api", "ConnectionStrings__redis", "redis:6380")
            .unwrap();

        let env = topology.resolved_environment("basket-api").unwrap();
        assert_eq!(env["ConnectionStrings__redis"], "redis:6380");
    }

    #[test]
    fn external_flag_applies_to_all_endpoints() {
        let node = web("webapp", 1, 2).with_external_endpoints();
        assert!(node.endpoints.iter().all(|e| e.external));
    }
}
