//! The fixed eShop service set the discovered stores join.

use stevedore_core::Scheme;

use crate::topology::{Endpoint, ServiceNode, Topology, TopologyError};

pub const REDIS: &str = "redis";
pub const EVENT_BUS: &str = "eventbus";
pub const CATALOG_DB: &str = "catalogdb";
pub const IDENTITY_DB: &str = "identitydb";
pub const ORDERING_DB: &str = "orderingdb";
pub const WEBHOOKS_DB: &str = "webhooksdb";

pub const IDENTITY_API: &str = "identity-api";
pub const BASKET_API: &str = "basket-api";
pub const CATALOG_API: &str = "catalog-api";
pub const ORDERING_API: &str = "ordering-api";
pub const ORDER_PROCESSOR: &str = "order-processor";
pub const PAYMENT_PROCESSOR: &str = "payment-processor";
pub const WEBHOOKS_API: &str = "webhooks-api";
pub const MOBILE_BFF: &str = "mobile-bff";
pub const WEBHOOKS_CLIENT: &str = "webhooksclient";
pub const WEBAPP: &str = "webapp";

fn http(port: u16) -> Endpoint {
    Endpoint::new(Scheme::Http, port)
}

fn https(port: u16) -> Endpoint {
    Endpoint::new(Scheme::Https, port)
}

fn postgres(db: &str) -> ServiceNode {
    ServiceNode::infrastructure(db, &format!("Host=localhost;Port=5432;Database={db}"))
}

/// Build the core topology with `profile` selecting which endpoint the
/// launch-profile references (identity, callbacks) point at.
pub fn core_topology(profile: Scheme) -> Result<Topology, TopologyError> {
    let launch = profile.as_str();
    let mut t = Topology::new();

    // Every node first; the identity entries below form a cycle.
    for node in [
        ServiceNode::infrastructure(REDIS, "localhost:6379"),
        ServiceNode::infrastructure(EVENT_BUS, "amqp://localhost:5672"),
        postgres(CATALOG_DB),
        postgres(IDENTITY_DB),
        postgres(ORDERING_DB),
        postgres(WEBHOOKS_DB),
        ServiceNode::project(IDENTITY_API)
            .with_endpoint(http(5223))
            .with_endpoint(https(5243))
            .with_external_endpoints(),
        ServiceNode::project(BASKET_API).with_endpoint(http(5221)),
        ServiceNode::project(CATALOG_API).with_endpoint(http(5222)),
        ServiceNode::project(ORDERING_API).with_endpoint(http(5224)),
        ServiceNode::project(ORDER_PROCESSOR),
        ServiceNode::project(PAYMENT_PROCESSOR),
        ServiceNode::project(WEBHOOKS_API).with_endpoint(http(5227)),
        ServiceNode::project(MOBILE_BFF).with_endpoint(http(11632)),
        ServiceNode::project(WEBHOOKS_CLIENT)
            .with_endpoint(http(5062))
            .with_endpoint(https(7260)),
        ServiceNode::project(WEBAPP)
            .with_endpoint(http(5045))
            .with_endpoint(https(7298))
            .with_external_endpoints(),
    ] {
        t.add_node(node)?;
    }

    t.add_reference(IDENTITY_API, IDENTITY_DB)?;

    t.add_reference(BASKET_API, REDIS)?;
    uses_event_bus(&mut t, BASKET_API)?;
    t.set_endpoint_env(BASKET_API, "Identity__Url", IDENTITY_API, launch)?;

    uses_event_bus(&mut t, CATALOG_API)?;
    t.add_reference(CATALOG_API, CATALOG_DB)?;

    uses_event_bus(&mut t, ORDERING_API)?;
    t.add_reference(ORDERING_API, ORDERING_DB)?;
    t.add_wait_for(ORDERING_API, ORDERING_DB)?;
    t.set_endpoint_env(ORDERING_API, "Identity__Url", IDENTITY_API, launch)?;

    uses_event_bus(&mut t, ORDER_PROCESSOR)?;
    t.add_reference(ORDER_PROCESSOR, ORDERING_DB)?;
    t.add_wait_for(ORDER_PROCESSOR, ORDERING_API)?;

    uses_event_bus(&mut t, PAYMENT_PROCESSOR)?;

    uses_event_bus(&mut t, WEBHOOKS_API)?;
    t.add_reference(WEBHOOKS_API, WEBHOOKS_DB)?;
    t.set_endpoint_env(WEBHOOKS_API, "Identity__Url", IDENTITY_API, launch)?;

    for target in [CATALOG_API, ORDERING_API, BASKET_API, IDENTITY_API] {
        t.add_reference(MOBILE_BFF, target)?;
    }

    t.add_reference(WEBHOOKS_CLIENT, WEBHOOKS_API)?;
    t.set_endpoint_env(WEBHOOKS_CLIENT, "IdentityUrl", IDENTITY_API, launch)?;

    for target in [BASKET_API, CATALOG_API, ORDERING_API] {
        t.add_reference(WEBAPP, target)?;
    }
    uses_event_bus(&mut t, WEBAPP)?;
    t.set_endpoint_env(WEBAPP, "IdentityUrl", IDENTITY_API, launch)?;

    t.set_endpoint_env(WEBAPP, "CallBackUrl", WEBAPP, launch)?;
    t.set_endpoint_env(WEBHOOKS_CLIENT, "CallBackUrl", WEBHOOKS_CLIENT, launch)?;

    t.set_endpoint_env(IDENTITY_API, "BasketApiClient", BASKET_API, "http")?;
    t.set_endpoint_env(IDENTITY_API, "OrderingApiClient", ORDERING_API, "http")?;
    t.set_endpoint_env(IDENTITY_API, "WebhooksApiClient", WEBHOOKS_API, "http")?;
    t.set_endpoint_env(IDENTITY_API, "WebhooksWebClient", WEBHOOKS_CLIENT, launch)?;
    t.set_endpoint_env(IDENTITY_API, "WebAppClient", WEBAPP, launch)?;

    Ok(t)
}

/// Reference the event bus and wait for it to come up.
pub(crate) fn uses_event_bus(t: &mut Topology, node: &str) -> Result<(), TopologyError> {
    t.add_reference(node, EVENT_BUS)?;
    t.add_wait_for(node, EVENT_BUS)
}
