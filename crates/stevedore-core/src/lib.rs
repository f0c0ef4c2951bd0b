//! Core types and configuration for stevedore.
//!
//! This crate defines the `stevedore.toml` schema ([`StevedoreConfig`]), the
//! build-completion event, image metadata parsing, and the pure planning steps
//! of the deployment pipeline:
//!
//! ```text
//! declared env ──▶ EnvironmentResolver ──▶ ResolvedEnvironment
//!                                              │
//!                                              ├──▶ PortBindingPlan
//!                                              ▼
//!                                        ContainerSpec
//! ```
//!
//! Nothing here talks to the container engine.

pub mod config;
pub mod environment;
pub mod error;
pub mod event;
pub mod image;
pub mod ports;
pub mod spec;

pub use config::{
    DeployConfig, DiscoveryConfig, EngineConfig, ExternalConfig, StevedoreConfig,
    USE_HTTP_ENDPOINTS_VAR, working_dir,
};
pub use environment::{EnvironmentResolver, ResolvedEnvironment, Scheme};
pub use error::{Error, Result};
pub use event::BuildCompletionEvent;
pub use image::{ImageCandidate, ImageMetadata, SelectionPolicy, parse_declared_env};
pub use ports::{PortBindingPlan, plan_port_bindings};
pub use spec::{CertificateBind, ContainerSpec, strip_marker};
