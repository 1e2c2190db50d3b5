use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::registry::{ManifestError, RegistryService},
    infra::db::PostgresRepositories,
};

use super::{
    ApiError, db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub registry: Arc<RegistryService>,
    pub db: Arc<PostgresRepositories>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/r/{component_slug}", get(registry_manifest))
        .route("/_health/db", get(public_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn registry_manifest(
    State(state): State<HttpState>,
    Path(component_slug): Path<String>,
) -> Response {
    match state.registry.build_manifest(&component_slug).await {
        Ok(manifest) => Json(manifest).into_response(),
        Err(err) => manifest_error_response(err),
    }
}

fn manifest_error_response(err: ManifestError) -> Response {
    let status = match err {
        ManifestError::ComponentNotFound => StatusCode::NOT_FOUND,
        ManifestError::MetadataFetchFailed(_) | ManifestError::BlobFetchFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ApiError::from_error("infra::http::public::registry_manifest", status, &err).into_response()
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}
