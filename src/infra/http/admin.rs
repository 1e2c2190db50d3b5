//! Administrative listener: purge triggers and a database health probe.
//!
//! Bound to loopback by default; it carries no authentication of its own.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bento_api_types::PurgeResponse;

use crate::{
    application::purge::{PurgeError, PurgeService},
    domain::components::ComponentIdentifier,
    infra::db::PostgresRepositories,
};

use super::{
    ApiError, db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub purge: Arc<PurgeService>,
    pub db: Arc<PostgresRepositories>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/components/{id}/purge", post(purge_by_id))
        .route(
            "/components/{owner_id}/{slug}/purge",
            post(purge_by_owner_and_slug),
        )
        .route("/_health/db", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn purge_by_id(State(state): State<AdminState>, Path(id): Path<i64>) -> Response {
    purge_response(&state, ComponentIdentifier::ById(id)).await
}

async fn purge_by_owner_and_slug(
    State(state): State<AdminState>,
    Path((owner_id, slug)): Path<(String, String)>,
) -> Response {
    purge_response(
        &state,
        ComponentIdentifier::by_owner_and_slug(owner_id, slug),
    )
    .await
}

async fn purge_response(state: &AdminState, identifier: ComponentIdentifier) -> Response {
    match state.purge.purge(&identifier).await {
        Ok(result) => Json(PurgeResponse::from(result)).into_response(),
        Err(err) => purge_error_response(err),
    }
}

fn purge_error_response(err: PurgeError) -> Response {
    const SOURCE: &str = "infra::http::admin::purge";
    if matches!(err, PurgeError::ComponentNotFound) {
        return ApiError::from_error(SOURCE, StatusCode::NOT_FOUND, &err).into_response();
    }
    ApiError::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
        .with_retryable(err.is_retryable())
        .into_response()
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.db.health_check().await)
}
