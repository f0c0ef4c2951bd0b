use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::ExternalConfig;

/// Variable names read from images and written into containers.
pub mod vars {
    // Declared by the image at build time.
    pub const HTTP_PORT: &str = "HTTP_PORT";
    pub const HTTPS_PORT: &str = "HTTPS_PORT";
    pub const SITE_DOMAIN: &str = "SITE_DOMAIN";

    // Injected into the container (`__` separates configuration path segments).
    pub const MESSAGE_BUS: &str = "ConnectionStrings__ExternalRabbitMQ";
    pub const BASKET_API: &str = "Services__basket-api__http__0";
    pub const CATALOG_API: &str = "Services__catalog-api__http__0";
    pub const ORDERING_API: &str = "Services__ordering-api__http__0";
    pub const IDENTITY_URL: &str = "IdentityUrl";
    pub const CALLBACK_URL: &str = "CallBackUrl";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// `http` when plain-HTTP endpoints are requested, `https` otherwise.
    pub fn from_http_flag(use_http_endpoints: bool) -> Self {
        if use_http_endpoints {
            Self::Http
        } else {
            Self::Https
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URLs of the core services a storefront talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerEndpoints {
    pub basket: String,
    pub catalog: String,
    pub ordering: String,
}

/// Everything a new container needs to know about itself and its peers.
#[derive(Clone)]
pub struct ResolvedEnvironment {
    pub http_port: String,
    pub https_port: String,
    pub site_domain: Option<String>,
    pub peers: PeerEndpoints,
    pub identity_url: String,
    pub message_bus: SecretString,
    pub callback_url: String,
}

impl fmt::Debug for ResolvedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEnvironment")
            .field("http_port", &self.http_port)
            .field("https_port", &self.https_port)
            .field("site_domain", &self.site_domain)
            .field("peers", &self.peers)
            .field("identity_url", &self.identity_url)
            .field("message_bus", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

impl ResolvedEnvironment {
    /// Container-facing variables as an ordered `KEY=VALUE` list.
    pub fn container_env(&self) -> Vec<String> {
        [
            (vars::MESSAGE_BUS, self.message_bus.expose_secret()),
            (vars::BASKET_API, self.peers.basket.as_str()),
            (vars::CATALOG_API, self.peers.catalog.as_str()),
            (vars::ORDERING_API, self.peers.ordering.as_str()),
            (vars::IDENTITY_URL, self.identity_url.as_str()),
            (vars::CALLBACK_URL, self.callback_url.as_str()),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect()
    }

    /// Both host ports were declared by the image.
    pub fn has_both_ports(&self) -> bool {
        !self.http_port.is_empty() && !self.https_port.is_empty()
    }
}

/// Combines image-declared settings with externally supplied service discovery.
///
/// The scheme is fixed at construction, so `resolve` is a pure function of
/// the declared env.
#[derive(Debug, Clone)]
pub struct EnvironmentResolver {
    scheme: Scheme,
    external: ExternalConfig,
}

impl EnvironmentResolver {
    pub fn new(use_http_endpoints: bool, external: ExternalConfig) -> Self {
        Self {
            scheme: Scheme::from_http_flag(use_http_endpoints),
            external,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn resolve(&self, declared: &BTreeMap<String, String>) -> ResolvedEnvironment {
        // arch-lint: allow(no-silent-result-drop) reason="an undeclared variable resolves to an empty value"
        let lookup = |key: &str| declared.get(key).cloned().unwrap_or_default();

        let http_port = lookup(vars::HTTP_PORT);
        let https_port = lookup(vars::HTTPS_PORT);
        let site_domain = Some(lookup(vars::SITE_DOMAIN)).filter(|d| !d.is_empty());

        let callback_url = callback_url(
            self.scheme,
            site_domain.as_deref(),
            &http_port,
            &https_port,
        );

        ResolvedEnvironment {
            http_port,
            https_port,
            site_domain,
            peers: PeerEndpoints {
                basket: self.external.basket_api.clone(),
                catalog: self.external.catalog_api.clone(),
                ordering: self.external.ordering_api.clone(),
            },
            identity_url: self.external.identity_url.clone(),
            message_bus: self.external.message_bus.clone(),
            callback_url,
        }
    }
}

/// Public URL a container advertises for itself.
///
/// Uses the site domain when there is one, else `localhost` on the host port
/// belonging to the scheme.
pub fn callback_url(
    scheme: Scheme,
    site_domain: Option<&str>,
    http_port: &str,
    https_port: &str,
) -> String {
    match site_domain.filter(|d| !d.is_empty()) {
        Some(domain) => format!("{scheme}://{domain}"),
        None => {
            let port = match scheme {
                Scheme::Http => http_port,
                Scheme::Https => https_port,
            };
            format!("{scheme}://localhost:{port}")
        }
    }
}
