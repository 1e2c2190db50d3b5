//! Object-store contract used by the purge and registry services.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("blob `{key}` not found")]
    NotFound { key: String },
    #[error("invalid blob key `{key}`")]
    InvalidKey { key: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("object store responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("object store request failed: {source}")]
    Transport {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl BlobStoreError {
    pub fn transport(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transport {
            source: Box::new(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::NotFound { .. })
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Remove the blob stored under `key`. Missing blobs are treated as success.
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;

    /// Download the raw bytes stored under `key`.
    async fn get_raw(&self, key: &str) -> Result<Bytes, BlobStoreError>;
}
