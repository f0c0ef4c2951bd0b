use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::environment::ResolvedEnvironment;
use crate::ports::PortBindingPlan;

/// Host directory (or file) mounted into the container for TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBind {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

impl CertificateBind {
    /// Read-only bind of `host_path`, made absolute against `cwd` when relative.
    pub fn read_only(host_path: &Path, container_path: &str, cwd: &Path) -> Self {
        let host_path = if host_path.is_absolute() {
            host_path.to_path_buf()
        } else {
            cwd.join(host_path)
        };
        Self {
            host_path,
            container_path: container_path.to_owned(),
            read_only: true,
        }
    }

    /// Engine bind syntax: `host:container[:ro]`.
    pub fn to_bind(&self) -> String {
        let mode = if self.read_only { ":ro" } else { "" };
        format!(
            "{}:{}{mode}",
            self.host_path.display(),
            self.container_path
        )
    }
}

/// Everything submitted to the engine's create call. Built once, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    pub env: Vec<String>,
    pub exposed_ports: Vec<String>,
    pub port_bindings: BTreeMap<String, Option<String>>,
    pub certificate: CertificateBind,
}

impl ContainerSpec {
    pub fn new(
        image: &str,
        name: &str,
        env: &ResolvedEnvironment,
        plan: PortBindingPlan,
        certificate: CertificateBind,
    ) -> Self {
        Self {
            image: image.to_owned(),
            name: name.to_owned(),
            env: env.container_env(),
            exposed_ports: plan.exposed_ports,
            port_bindings: plan.bindings,
            certificate,
        }
    }

    /// Value of `key` in the env list, if present.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.iter().find_map(|entry| {
            entry
                .split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }
}

impl fmt::Debug for ContainerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self
            .env
            .iter()
            .map(|e| e.split_once('=').map_or(e.as_str(), |(k, _)| k))
            .collect();
        f.debug_struct("ContainerSpec")
            .field("image", &self.image)
            .field("name", &self.name)
            .field("env", &env_keys)
            .field("exposed_ports", &self.exposed_ports)
            .field("port_bindings", &self.port_bindings)
            .field("certificate", &self.certificate)
            .finish()
    }
}

/// Image reference used at creation time: `tag` without its trailing `:<marker>`.
///
/// Inspection filters by the full tag; only creation uses the stripped form.
pub fn strip_marker(tag: &str, marker: &str) -> String {
    match tag.strip_suffix(marker).and_then(|rest| rest.strip_suffix(':')) {
        Some(image) => image.to_owned(),
        None => tag.to_owned(),
    }
}
