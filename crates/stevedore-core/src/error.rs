use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to resolve working directory")]
    WorkingDir { source: std::io::Error },

    // ── Image metadata ──
    #[error("image {image} declares malformed env entry {entry:?}: {reason}")]
    MalformedMetadata {
        image: String,
        entry: String,
        reason: &'static str,
    },

    // ── Events ──
    #[error("failed to parse build completion event")]
    EventParse { source: serde_json::Error },
}
