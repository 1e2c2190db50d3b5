//! HTTP object-storage client.
//!
//! Objects live at `{endpoint}/{bucket}/{key}`; `GET` downloads and `DELETE`
//! removes them. Requests carry the configured bearer token.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, Response, StatusCode};
use url::Url;

use crate::application::storage::{BlobStore, BlobStoreError};
use crate::infra::error::InfraError;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    bucket_url: Url,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let mut bucket_url = Url::parse(endpoint).map_err(|err| {
            InfraError::configuration(format!("invalid storage endpoint `{endpoint}`: {err}"))
        })?;
        bucket_url
            .path_segments_mut()
            .map_err(|_| {
                InfraError::configuration(format!(
                    "storage endpoint `{endpoint}` cannot carry a path"
                ))
            })?
            .pop_if_empty()
            .push(bucket);

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::storage(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            bucket_url,
            token,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("bento/", env!("CARGO_PKG_VERSION"))
    }

    fn object_url(&self, key: &str) -> Result<Url, BlobStoreError> {
        let invalid = || BlobStoreError::InvalidKey {
            key: key.to_string(),
        };
        if key.is_empty()
            || key
                .split('/')
                .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(invalid());
        }

        let mut url = self.bucket_url.clone();
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .extend(key.split('/'));
        Ok(url)
    }

    async fn send(&self, method: Method, key: &str) -> Result<Response, BlobStoreError> {
        let url = self.object_url(key)?;
        let mut request = self.client.request(method, url);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        request.send().await.map_err(BlobStoreError::transport)
    }
}

async fn status_error(response: Response) -> BlobStoreError {
    let status = response.status().as_u16();
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        _ => "no response body".to_string(),
    };
    BlobStoreError::Status { status, message }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let response = self.send(Method::DELETE, key).await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(status_error(response).await)
    }

    async fn get_raw(&self, key: &str) -> Result<Bytes, BlobStoreError> {
        let response = self.send(Method::GET, key).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobStoreError::NotFound {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }
        response.bytes().await.map_err(BlobStoreError::transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: &str) -> HttpBlobStore {
        HttpBlobStore::new(endpoint, "components", None, Duration::from_secs(5)).expect("store")
    }

    #[test]
    fn object_urls_append_bucket_and_encoded_key() {
        let store = store("https://storage.example.com/storage/v1/object/");
        let url = store.object_url("user 1/button-code.tsx").expect("url");
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/storage/v1/object/components/user%201/button-code.tsx"
        );
    }

    #[test]
    fn endpoint_without_trailing_slash_is_accepted() {
        let store = store("https://storage.example.com/objects");
        let url = store.object_url("a.tsx").expect("url");
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/objects/components/a.tsx"
        );
    }

    #[test]
    fn rejects_traversal_and_empty_segments() {
        let store = store("https://storage.example.com/");
        for key in ["", "../a", "a//b", "./a", "/a"] {
            assert!(
                matches!(store.object_url(key), Err(BlobStoreError::InvalidKey { .. })),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_endpoint_is_a_configuration_error() {
        let err = HttpBlobStore::new("not a url", "b", None, Duration::from_secs(1))
            .expect_err("invalid endpoint");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }
}
