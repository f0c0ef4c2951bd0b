use serde::{Deserialize, Serialize};

/// Published by the image builder once a storefront image has been built.
///
/// Only `docker_tag` drives deployment; the rest describes the build itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildCompletionEvent {
    /// Integration-event id assigned by the publisher
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub root_store_project: String,
    #[serde(default)]
    pub docker_tag: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub docker_file_working_directory: String,
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub platform: String,
}

impl BuildCompletionEvent {
    pub fn from_json(payload: &str) -> crate::Result<Self> {
        serde_json::from_str(payload).map_err(|e| crate::Error::EventParse { source: e })
    }
}
