//! Filesystem-backed blob storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::application::storage::{BlobStore, BlobStoreError};

/// Blob store rooted at a directory; keys are relative paths beneath it.
#[derive(Debug)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under `key`. Publishing is external; tests use this to stage blobs.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobStoreError> {
        let absolute = self.resolve(key)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(absolute, data).await?;
        Ok(())
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(BlobStoreError::InvalidKey {
                key: key.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let absolute = self.resolve(key)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BlobStoreError::Io(err)),
        }
    }

    async fn get_raw(&self, key: &str) -> Result<Bytes, BlobStoreError> {
        let absolute = self.resolve(key)?;
        match fs::read(&absolute).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobStoreError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(err) => Err(BlobStoreError::Io(err)),
        }
    }
}
