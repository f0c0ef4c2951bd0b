use std::collections::BTreeMap;

use crate::environment::ResolvedEnvironment;

/// Container port serving plain HTTP.
pub const HTTP_CONTAINER_PORT: &str = "80/tcp";
/// Container port serving HTTPS.
pub const HTTPS_CONTAINER_PORT: &str = "443/tcp";

/// Exposed ports plus host bindings for one container.
///
/// A binding whose host port is `None` leaves the choice to the engine,
/// which assigns an ephemeral port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBindingPlan {
    pub exposed_ports: Vec<String>,
    pub bindings: BTreeMap<String, Option<String>>,
}

impl PortBindingPlan {
    /// Host port bound to `container_port`, if one was declared.
    pub fn host_port(&self, container_port: &str) -> Option<&str> {
        self.bindings.get(container_port)?.as_deref()
    }
}

/// Expose 80/tcp and 443/tcp and bind them to the declared host ports.
pub fn plan_port_bindings(env: &ResolvedEnvironment) -> PortBindingPlan {
    let host = |port: &str| Some(port.to_owned()).filter(|p| !p.is_empty());

    PortBindingPlan {
        exposed_ports: vec![
            HTTP_CONTAINER_PORT.to_owned(),
            HTTPS_CONTAINER_PORT.to_owned(),
        ],
        bindings: BTreeMap::from([
            (HTTP_CONTAINER_PORT.to_owned(), host(&env.http_port)),
            (HTTPS_CONTAINER_PORT.to_owned(), host(&env.https_port)),
        ]),
    }
}
