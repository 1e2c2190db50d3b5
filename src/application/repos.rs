//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::components::{ComponentField, ComponentFilter, ComponentRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("expected exactly one matching record, found {matches}")]
    Ambiguous { matches: usize },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Collapse a candidate list into the single record it must contain.
    pub fn single<T>(mut rows: Vec<T>) -> Result<T, RepoError> {
        match rows.len() {
            0 => Err(RepoError::NotFound),
            1 => Ok(rows.remove(0)),
            matches => Err(RepoError::Ambiguous { matches }),
        }
    }
}

#[async_trait]
pub trait ComponentsRepo: Send + Sync {
    /// Fetch the one record matching `filter`.
    ///
    /// Zero matches is [`RepoError::NotFound`]; more than one is
    /// [`RepoError::Ambiguous`].
    async fn fetch_one(&self, filter: &ComponentFilter) -> Result<ComponentRecord, RepoError>;

    /// Overwrite a nullable field on the record with primary key `id`.
    async fn update_field(
        &self,
        id: i64,
        field: ComponentField,
        value: Option<String>,
    ) -> Result<(), RepoError>;
}
