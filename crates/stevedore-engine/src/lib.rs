//! Container engine access and the deployment pipeline for stevedore.
//!
//! # Event path
//!
//! ```text
//! BuildCompletionEvent
//!   1. Trigger    ── name = <tag with ':' → '_'>_<uuid>
//!   2. Inspect    ── list images by reference = <tag>, pick one, parse env
//!   3. Resolve    ── EnvironmentResolver + plan_port_bindings
//!   4. Create     ── image = <tag without :marker>, cert bind, env, ports
//!   5. Start      ── remove the container again if start fails
//! ```
//!
//! Every engine call goes through [`ContainerEngine`], so the pipeline can be
//! driven against a mock in tests and against [`DockerEngine`] in production.

pub mod deployer;
pub mod engine;
pub mod error;
pub mod inspector;
pub mod trigger;

pub use deployer::ContainerDeployer;
pub use engine::{ContainerEngine, DockerEngine, ImageDetails};
pub use error::{DeployError, EngineError, InspectError};
pub use inspector::ImageInspector;
pub use trigger::{DeploymentTrigger, IntegrationEventHandler, TriggerOutcome, container_name_for};
