//! Component cache purging.
//!
//! A purge deletes every blob a component references and then clears the
//! component's compiled stylesheet. Blob deletion is best effort: failures are
//! reported in [`PurgeResult::failed_deletes`] and never stop the metadata reset.
//! The metadata reset is mandatory: if it fails the purge fails, because a cached
//! stylesheet pointing at deleted assets must not survive.

use std::sync::Arc;

use bento_api_types::PurgeResponse;
use futures::future::join_all;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{ComponentsRepo, RepoError};
use crate::application::storage::BlobStore;
use crate::domain::components::{ComponentField, ComponentIdentifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeResult {
    pub component_id: i64,
    pub failed_deletes: Vec<String>,
}

impl From<PurgeResult> for PurgeResponse {
    fn from(result: PurgeResult) -> Self {
        Self {
            component_id: result.component_id,
            failed_deletes: result.failed_deletes,
        }
    }
}

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("Component not found")]
    ComponentNotFound,
    #[error("failed to fetch component: {0}")]
    MetadataFetchFailed(#[source] RepoError),
    #[error("failed to reset compiled css for component {component_id}: {source}")]
    MetadataResetFailed {
        component_id: i64,
        #[source]
        source: RepoError,
    },
}

impl PurgeError {
    /// Whether the caller should retry the purge.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PurgeError::MetadataResetFailed { .. })
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            PurgeError::ComponentNotFound => "not_found",
            PurgeError::MetadataFetchFailed(_) => "fetch_failed",
            PurgeError::MetadataResetFailed { .. } => "reset_failed",
        }
    }
}

#[derive(Clone)]
pub struct PurgeService {
    components: Arc<dyn ComponentsRepo>,
    blobs: Arc<dyn BlobStore>,
}

impl PurgeService {
    pub fn new(components: Arc<dyn ComponentsRepo>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { components, blobs }
    }

    pub async fn purge(&self, identifier: &ComponentIdentifier) -> Result<PurgeResult, PurgeError> {
        let result = self.run(identifier).await;
        let outcome = match &result {
            Ok(result) if result.failed_deletes.is_empty() => "success",
            Ok(_) => "partial",
            Err(err) => err.outcome_label(),
        };
        counter!("bento_purge_total", "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, identifier: &ComponentIdentifier) -> Result<PurgeResult, PurgeError> {
        let record = self
            .components
            .fetch_one(&identifier.filter())
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PurgeError::ComponentNotFound,
                other => PurgeError::MetadataFetchFailed(other),
            })?;

        let keys = record.blob_refs();
        let failed_deletes = self.delete_blobs(record.id, &keys).await;

        self.components
            .update_field(record.id, ComponentField::CompiledCss, None)
            .await
            .map_err(|source| PurgeError::MetadataResetFailed {
                component_id: record.id,
                source,
            })?;

        info!(
            target = "bento::purge",
            component_id = record.id,
            identifier = %identifier,
            deleted = keys.len() - failed_deletes.len(),
            failed = failed_deletes.len(),
            "component cache purged"
        );

        Ok(PurgeResult {
            component_id: record.id,
            failed_deletes,
        })
    }

    /// Delete every key concurrently and return the keys that could not be removed.
    async fn delete_blobs(&self, component_id: i64, keys: &[&str]) -> Vec<String> {
        let outcomes = join_all(keys.iter().map(|key| async move {
            let outcome = self.blobs.delete(key).await;
            (*key, outcome)
        }))
        .await;

        outcomes
            .into_iter()
            .filter_map(|(key, outcome)| match outcome {
                Ok(()) => None,
                Err(err) => {
                    warn!(
                        target = "bento::purge",
                        component_id,
                        key,
                        error = %err,
                        "failed to delete component blob"
                    );
                    counter!("bento_purge_blob_delete_failed_total").increment(1);
                    Some(key.to_string())
                }
            })
            .collect()
    }
}
