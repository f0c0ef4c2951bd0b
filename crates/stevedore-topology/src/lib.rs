//! Application topology for stevedore.
//!
//! The topology is a mutable registry of service nodes. The fixed eShop set
//! comes from [`core_topology`]; locally built store images found by
//! [`discover_services`] are added with [`register`].
//!
//! ```text
//! core_topology ──▶ Topology ◀── register ◀── discover_services ◀── :stores images
//!                      │
//!                      ▼
//!               resolve() → ResolvedNode per service
//! ```

pub mod core_services;
pub mod discovery;
pub mod topology;

pub use core_services::core_topology;
pub use discovery::{DiscoveredService, discover_services, register, service_name};
pub use topology::{
    BindMount, EnvValue, Endpoint, NodeKind, ResolvedNode, ServiceNode, Topology, TopologyError,
};
