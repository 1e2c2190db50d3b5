mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use middleware::RequestContext;
pub use public::{HttpState, build_router};

use crate::application::error::ErrorReport;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bento_api_types::ErrorBody;
use sqlx::Error as SqlxError;

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// JSON error response carrying an [`ErrorReport`] for the logging middleware.
#[derive(Debug)]
pub struct ApiError {
    source: &'static str,
    status: StatusCode,
    body: ErrorBody,
    report: Vec<String>,
}

impl ApiError {
    /// Build a response whose body message is the error's own display text.
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        error: &dyn std::error::Error,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            source,
            status,
            body: ErrorBody::new(error.to_string()),
            report: report.messages,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.body = self.body.with_retryable(retryable);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        ErrorReport {
            source: self.source,
            status: self.status,
            messages: self.report,
        }
        .attach(&mut response);
        response
    }
}
