use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::environment::vars;
use crate::image::SelectionPolicy;
use crate::spec::CertificateBind;

/// Name of the process-environment flag that switches external endpoints to plain HTTP.
pub const USE_HTTP_ENDPOINTS_VAR: &str = "ESHOP_USE_HTTP_ENDPOINTS";

/// stevedore.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StevedoreConfig {
    /// Use `http` instead of `https` for callback URLs and launch profiles
    #[serde(default)]
    pub use_http_endpoints: bool,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub connection_strings: ConnectionStringsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unix socket of the engine (defaults to the platform's local engine)
    pub socket: Option<PathBuf>,
    /// Budget for each individual engine call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Tag suffix marking deployable storefront images (`<repo>:<marker>`)
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Host directory holding the TLS certificate
    #[serde(default = "default_certificate_dir")]
    pub certificate_dir: PathBuf,
    /// Path the certificate directory is mounted at inside the container
    #[serde(default = "default_certificate_mount")]
    pub certificate_mount: String,
    /// Which image wins when several match the same tag
    #[serde(default)]
    pub selection: SelectionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Certificate file bind-mounted into discovered services
    #[serde(default = "default_certificate_file")]
    pub certificate_file: PathBuf,
    /// Target path of the certificate file inside discovered services
    #[serde(default = "default_certificate_target")]
    pub certificate_target: String,
}

/// Peer-service endpoints handed to deployed containers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub basket_api: Option<String>,
    pub catalog_api: Option<String>,
    pub ordering_api: Option<String>,
    pub identity_url: Option<String>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStringsConfig {
    pub external_rabbitmq: Option<String>,
}

impl fmt::Debug for ConnectionStringsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStringsConfig")
            .field(
                "external_rabbitmq",
                &self.external_rabbitmq.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Service-discovery and identity values injected into every deployed container.
///
/// Missing values are empty strings; consumers must tolerate them.
#[derive(Clone)]
pub struct ExternalConfig {
    pub message_bus: SecretString,
    pub basket_api: String,
    pub catalog_api: String,
    pub ordering_api: String,
    pub identity_url: String,
}

impl fmt::Debug for ExternalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalConfig")
            .field("message_bus", &"[REDACTED]")
            .field("basket_api", &self.basket_api)
            .field("catalog_api", &self.catalog_api)
            .field("ordering_api", &self.ordering_api)
            .field("identity_url", &self.identity_url)
            .finish()
    }
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            message_bus: SecretString::from(String::new()),
            basket_api: String::new(),
            catalog_api: String::new(),
            ordering_api: String::new(),
            identity_url: String::new(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            certificate_dir: default_certificate_dir(),
            certificate_mount: default_certificate_mount(),
            selection: SelectionPolicy::default(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            certificate_file: default_certificate_file(),
            certificate_target: default_certificate_target(),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DeployConfig {
    /// Certificate directory bind for event-driven deployments.
    pub fn certificate_bind(&self, cwd: &Path) -> CertificateBind {
        CertificateBind::read_only(&self.certificate_dir, &self.certificate_mount, cwd)
    }
}

impl DiscoveryConfig {
    /// Certificate file bind for discovered services.
    pub fn certificate_bind(&self, cwd: &Path) -> CertificateBind {
        CertificateBind::read_only(&self.certificate_file, &self.certificate_target, cwd)
    }
}

/// Current working directory, used to anchor relative certificate paths.
pub fn working_dir() -> crate::Result<PathBuf> {
    std::env::current_dir().map_err(|e| crate::Error::WorkingDir { source: e })
}

impl StevedoreConfig {
    /// Load from stevedore.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join("stevedore.toml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Load stevedore.toml, then overlay `.env` and the process environment.
    ///
    /// The environment is read exactly once here; nothing downstream consults it.
    pub fn load_from_env(project_dir: &Path) -> crate::Result<Self> {
        let dotenv_loaded = dotenvy::dotenv().is_ok();
        tracing::debug!(dotenv = dotenv_loaded, "loading stevedore config");

        let mut config = Self::load(project_dir)?;
        // arch-lint: allow(no-silent-result-drop) reason="an unset or non-UTF-8 variable leaves the file/default value in place"
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override values with variables found by `lookup`, using the
    /// container-facing names (`Services__basket-api__http__0`, ...).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(USE_HTTP_ENDPOINTS_VAR) {
            self.use_http_endpoints = matches!(v.trim().parse::<i64>(), Ok(1));
        }
        if let Some(v) = lookup(vars::MESSAGE_BUS) {
            self.connection_strings.external_rabbitmq = Some(v);
        }
        if let Some(v) = lookup(vars::BASKET_API) {
            self.services.basket_api = Some(v);
        }
        if let Some(v) = lookup(vars::CATALOG_API) {
            self.services.catalog_api = Some(v);
        }
        if let Some(v) = lookup(vars::ORDERING_API) {
            self.services.ordering_api = Some(v);
        }
        if let Some(v) = lookup(vars::IDENTITY_URL) {
            self.services.identity_url = Some(v);
        }
    }

    /// Snapshot of the peer endpoints and secrets handed to new containers.
    pub fn external(&self) -> ExternalConfig {
        // arch-lint: allow(no-silent-result-drop) reason="an unset service value is injected as an empty string"
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        ExternalConfig {
            message_bus: SecretString::from(text(&self.connection_strings.external_rabbitmq)),
            basket_api: text(&self.services.basket_api),
            catalog_api: text(&self.services.catalog_api),
            ordering_api: text(&self.services.ordering_api),
            identity_url: text(&self.services.identity_url),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_marker() -> String {
    "stores".to_owned()
}

fn default_certificate_dir() -> PathBuf {
    PathBuf::from("./certs/")
}

fn default_certificate_mount() -> String {
    "/https/".to_owned()
}

fn default_certificate_file() -> PathBuf {
    PathBuf::from("./certs/aspnet-dev.pfx")
}

fn default_certificate_target() -> String {
    "/https/aspnet-dev.pfx".to_owned()
}
