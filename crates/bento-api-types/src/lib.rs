//! Request and response types shared between the bento server and registry consumers.
//!
//! Field names and literal values in [`RegistryManifest`] are consumed by third-party
//! component tooling and must not change.

use serde::{Deserialize, Serialize};

/// Item type advertised for every manifest and file entry.
pub const REGISTRY_UI_TYPE: &str = "registry:ui";

/// Directory prefix under which consumers place fetched component sources.
pub const REGISTRY_FILE_DIR: &str = "cc";

/// Registry item describing a single component and its source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub files: Vec<RegistryFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    pub path: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
}

impl RegistryManifest {
    /// Build the single-file manifest for `slug` around already-escaped `content`.
    pub fn single_file(slug: &str, content: String) -> Self {
        Self {
            name: slug.to_string(),
            kind: REGISTRY_UI_TYPE.to_string(),
            files: vec![RegistryFile {
                path: format!("{REGISTRY_FILE_DIR}/{slug}.tsx"),
                content,
                kind: REGISTRY_UI_TYPE.to_string(),
                target: String::new(),
            }],
        }
    }
}

/// Outcome of a completed purge. `failed_deletes` lists blob keys left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub component_id: i64,
    pub failed_deletes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            retryable: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}
