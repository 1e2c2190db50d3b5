//! Registry manifests for component tooling.
//!
//! The source blob is located by naming convention (`<slug>-code.tsx`), not through
//! the component's stored `code_ref`.

use std::sync::Arc;

use bento_api_types::RegistryManifest;
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{ComponentsRepo, RepoError};
use crate::application::storage::{BlobStore, BlobStoreError};
use crate::domain::components::ComponentFilter;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Component not found")]
    ComponentNotFound,
    #[error("failed to fetch component: {0}")]
    MetadataFetchFailed(#[source] RepoError),
    #[error("failed to fetch `{key}`: {source}")]
    BlobFetchFailed {
        key: String,
        #[source]
        source: BlobStoreError,
    },
}

#[derive(Clone)]
pub struct RegistryService {
    components: Arc<dyn ComponentsRepo>,
    blobs: Arc<dyn BlobStore>,
}

impl RegistryService {
    pub fn new(components: Arc<dyn ComponentsRepo>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { components, blobs }
    }

    pub async fn build_manifest(&self, slug: &str) -> Result<RegistryManifest, ManifestError> {
        self.components
            .fetch_one(&ComponentFilter::Slug(slug.to_string()))
            .await
            .map_err(|err| match err {
                RepoError::NotFound => ManifestError::ComponentNotFound,
                other => ManifestError::MetadataFetchFailed(other),
            })?;

        let key = source_blob_key(slug);
        let raw = self
            .blobs
            .get_raw(&key)
            .await
            .map_err(|source| ManifestError::BlobFetchFailed {
                key: key.clone(),
                source,
            })?;

        let source = String::from_utf8_lossy(&raw);
        debug!(
            target = "bento::registry",
            slug,
            key = %key,
            bytes = raw.len(),
            "building registry manifest"
        );
        counter!("bento_registry_manifest_total").increment(1);

        Ok(RegistryManifest::single_file(
            slug,
            format!("\"{}\"", escape_source(&source)),
        ))
    }
}

pub fn source_blob_key(slug: &str) -> String {
    format!("{slug}-code.tsx")
}

/// Escape source text for embedding in a double-quoted string literal.
///
/// Backslashes are escaped first so later escapes are not doubled.
pub fn escape_source(source: &str) -> String {
    source
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::domain::components::{ComponentField, ComponentRecord};

    struct StubComponentsRepo {
        records: Vec<ComponentRecord>,
    }

    #[async_trait]
    impl ComponentsRepo for StubComponentsRepo {
        async fn fetch_one(&self, filter: &ComponentFilter) -> Result<ComponentRecord, RepoError> {
            RepoError::single(
                self.records
                    .iter()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect(),
            )
        }

        async fn update_field(
            &self,
            _id: i64,
            _field: ComponentField,
            _value: Option<String>,
        ) -> Result<(), RepoError> {
            unreachable!("not used in these tests")
        }
    }

    #[derive(Default)]
    struct StubBlobStore {
        blobs: HashMap<String, Bytes>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for StubBlobStore {
        async fn delete(&self, _key: &str) -> Result<(), BlobStoreError> {
            unreachable!("not used in these tests")
        }

        async fn get_raw(&self, key: &str) -> Result<Bytes, BlobStoreError> {
            self.requested.lock().unwrap().push(key.to_string());
            self.blobs
                .get(key)
                .cloned()
                .ok_or_else(|| BlobStoreError::NotFound { key: key.into() })
        }
    }

    fn component(slug: &str, code_ref: &str) -> ComponentRecord {
        ComponentRecord {
            id: 1,
            owner_id: "u1".into(),
            slug: slug.into(),
            code_ref: Some(code_ref.into()),
            demo_code_ref: None,
            tailwind_extension_ref: None,
            global_css_extension_ref: None,
            compiled_css_cache: None,
        }
    }

    fn service_with(slug: &str, blob: Option<&str>) -> (RegistryService, Arc<StubBlobStore>) {
        let repo = Arc::new(StubComponentsRepo {
            records: vec![component(slug, "stored/ref.tsx")],
        });
        let mut store = StubBlobStore::default();
        if let Some(blob) = blob {
            store
                .blobs
                .insert(source_blob_key(slug), Bytes::from(blob.to_string()));
        }
        let store = Arc::new(store);
        (RegistryService::new(repo, store.clone()), store)
    }

    fn unescape(content: &str) -> String {
        let inner = &content[1..content.len() - 1];
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            } else {
                out.push(ch);
            }
        }
        out
    }

    #[test]
    fn escapes_backslash_before_quotes_and_newlines() {
        assert_eq!(escape_source(r#"a\"b"#), r#"a\\\"b"#);
        assert_eq!(escape_source("line1\nline2"), r"line1\nline2");
        assert_eq!(escape_source(r"C:\path"), r"C:\\path");
    }

    #[test]
    fn escaping_round_trips() {
        let original = "a\\\"b\nc";
        let content = format!("\"{}\"", escape_source(original));
        assert_eq!(unescape(&content), original);
    }

    #[tokio::test]
    async fn manifest_embeds_escaped_source() {
        let (service, _) = service_with("button", Some(r#"const x = "hi";"#));

        let manifest = service.build_manifest("button").await.expect("manifest");

        assert_eq!(manifest.name, "button");
        assert_eq!(manifest.kind, "registry:ui");
        assert_eq!(manifest.files.len(), 1);
        let file = &manifest.files[0];
        assert_eq!(file.path, "cc/button.tsx");
        assert_eq!(file.content, "\"const x = \\\"hi\\\";\"");
        assert_eq!(file.kind, "registry:ui");
        assert_eq!(file.target, "");
    }

    #[tokio::test]
    async fn manifest_reads_conventional_key_not_code_ref() {
        let (service, store) = service_with("card", Some("export {}"));

        service.build_manifest("card").await.expect("manifest");

        assert_eq!(
            store.requested.lock().unwrap().as_slice(),
            &["card-code.tsx".to_string()]
        );
    }

    #[tokio::test]
    async fn manifest_is_idempotent() {
        let (service, _) = service_with("button", Some("a\\b\n\"c\""));

        let first = serde_json::to_vec(&service.build_manifest("button").await.unwrap()).unwrap();
        let second = serde_json::to_vec(&service.build_manifest("button").await.unwrap()).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let (service, store) = service_with("button", Some("x"));

        let err = service.build_manifest("missing").await.expect_err("no component");

        assert!(matches!(err, ManifestError::ComponentNotFound));
        assert_eq!(err.to_string(), "Component not found");
        assert!(store.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_blob_is_a_fetch_failure() {
        let (service, _) = service_with("button", None);

        let err = service.build_manifest("button").await.expect_err("no blob");

        match err {
            ManifestError::BlobFetchFailed { key, source } => {
                assert_eq!(key, "button-code.tsx");
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    struct UnreachableBlobStore;

    #[async_trait]
    impl BlobStore for UnreachableBlobStore {
        async fn delete(&self, _key: &str) -> Result<(), BlobStoreError> {
            unreachable!("not used in these tests")
        }

        async fn get_raw(&self, _key: &str) -> Result<Bytes, BlobStoreError> {
            Err(BlobStoreError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        }
    }

    #[tokio::test]
    async fn transport_failure_keeps_underlying_message() {
        let repo = Arc::new(StubComponentsRepo {
            records: vec![component("button", "stored/ref.tsx")],
        });
        let service = RegistryService::new(repo, Arc::new(UnreachableBlobStore));

        let err = service.build_manifest("button").await.expect_err("unreachable");

        assert_eq!(
            err.to_string(),
            "failed to fetch `button-code.tsx`: object store request failed: connection refused"
        );
    }
}
