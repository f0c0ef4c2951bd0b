use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An image as reported by an engine listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub id: String,
    pub repo_tags: Vec<String>,
    /// Creation time, seconds since the Unix epoch
    pub created: i64,
}

impl ImageCandidate {
    /// First repo tag ending in `:<marker>`, compared case-insensitively.
    pub fn matching_tag(&self, marker: &str) -> Option<&str> {
        let suffix = format!(":{}", marker.to_ascii_lowercase());
        self.repo_tags
            .iter()
            .find(|tag| tag.to_ascii_lowercase().ends_with(&suffix))
            .map(String::as_str)
    }
}

/// Tie-break used when more than one image matches a reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Newest creation timestamp; equal timestamps fall back to the greatest id.
    #[default]
    MostRecent,
    /// Whatever the engine listed first.
    First,
}

impl SelectionPolicy {
    pub fn select<'a>(&self, candidates: &'a [ImageCandidate]) -> Option<&'a ImageCandidate> {
        match self {
            Self::MostRecent => candidates
                .iter()
                .max_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id))),
            Self::First => candidates.first(),
        }
    }
}

/// Read-only view of an inspected image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub image_id: String,
    pub declared_env: BTreeMap<String, String>,
    pub repo_tags: Vec<String>,
}

impl ImageMetadata {
    /// Build metadata from raw inspection output, rejecting malformed env entries.
    pub fn from_inspection(
        image_id: &str,
        env: &[String],
        repo_tags: Vec<String>,
    ) -> crate::Result<Self> {
        Ok(Self {
            image_id: image_id.to_owned(),
            declared_env: parse_declared_env(image_id, env)?,
            repo_tags,
        })
    }
}

/// Parse `KEY=VALUE` entries into a map.
///
/// Entries split on the first `=`, so values may themselves contain `=`.
/// A missing `=`, an empty key, or a repeated key fails the whole image.
pub fn parse_declared_env(
    image: &str,
    entries: &[String],
) -> crate::Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for entry in entries {
        let malformed = |reason| crate::Error::MalformedMetadata {
            image: image.to_owned(),
            entry: entry.clone(),
            reason,
        };

        let (key, value) = entry.split_once('=').ok_or_else(|| malformed("missing '='"))?;
        if key.is_empty() {
            return Err(malformed("empty variable name"));
        }
        if env.insert(key.to_owned(), value.to_owned()).is_some() {
            return Err(malformed("variable declared twice"));
        }
    }
    Ok(env)
}
