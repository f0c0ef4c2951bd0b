use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot connect to the container engine")]
    Connect { source: bollard::errors::Error },

    #[error("engine rejected {operation} (status {status}): {message}")]
    Daemon {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("engine request {operation} failed")]
    Transport {
        operation: &'static str,
        source: bollard::errors::Error,
    },

    #[error("engine request {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("no local image matches {reference}")]
    NotFound { reference: String },

    #[error("image metadata for {reference} is unusable")]
    Malformed {
        reference: String,
        source: stevedore_core::Error,
    },

    #[error("engine call failed while inspecting {reference}")]
    Engine {
        reference: String,
        source: EngineError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("no local image matches {tag}")]
    ImageNotFound { tag: String },

    #[error("failed to inspect image {tag}")]
    Inspect { tag: String, source: InspectError },

    #[error("failed to create container {name} from {image}")]
    Create {
        name: String,
        image: String,
        source: EngineError,
    },

    #[error("container {name} ({container_id}) was created but did not start; removed: {cleaned_up}")]
    PartialDeployment {
        name: String,
        container_id: String,
        cleaned_up: bool,
        source: EngineError,
    },
}
