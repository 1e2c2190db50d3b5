//! Object-storage adapters.

mod filesystem;
mod http;

pub use filesystem::FilesystemBlobStore;
pub use http::HttpBlobStore;

use std::sync::Arc;

use crate::application::storage::BlobStore;
use crate::config::{StorageBackend, StorageSettings};
use crate::infra::error::InfraError;

/// Open the configured backend scoped to `bucket`.
///
/// Filesystem buckets are subdirectories of the storage directory.
pub fn open_bucket(
    settings: &StorageSettings,
    bucket: &str,
) -> Result<Arc<dyn BlobStore>, InfraError> {
    match &settings.backend {
        StorageBackend::Filesystem { directory } => {
            let store = FilesystemBlobStore::new(directory.join(bucket))?;
            Ok(Arc::new(store))
        }
        StorageBackend::Http { endpoint, token } => {
            let store = HttpBlobStore::new(endpoint, bucket, token.clone(), settings.timeout)?;
            Ok(Arc::new(store))
        }
    }
}
