use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request identity shared with handlers and the response logger.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    /// Route template the request matched, e.g. `/components/{id}/purge`.
    pub route: Option<String>,
}

impl RequestContext {
    fn route_label(&self) -> &str {
        self.route.as_deref().unwrap_or("unmatched")
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string());
    let ctx = RequestContext {
        request_id: request_id.clone(),
        route,
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let (request_id, route) = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| (ctx.request_id.clone(), ctx.route_label().to_string()))
        .unwrap_or_else(|| (String::new(), "unmatched".to_string()));

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "bento::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                route = %route,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "bento::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                route = %route,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, middleware, routing::post};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn echo_route(Extension(ctx): Extension<RequestContext>) -> String {
        format!("{} {}", ctx.route_label(), ctx.request_id.len())
    }

    #[tokio::test]
    async fn request_context_records_matched_route() {
        let router = Router::new()
            .route("/components/{id}/purge", post(echo_route))
            .layer(middleware::from_fn(set_request_context));

        let request = Request::builder()
            .method("POST")
            .uri("/components/42/purge")
            .body(Body::empty())
            .expect("request should build");
        let response = router.oneshot(request).await.expect("router should respond");

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .expect("request id header");
        assert!(Uuid::parse_str(&header).is_ok());

        let context = response
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .expect("context on response");
        assert_eq!(context.route.as_deref(), Some("/components/{id}/purge"));
        assert_eq!(context.request_id, header);

        let body = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        assert_eq!(body.as_ref(), b"/components/{id}/purge 36");
    }

    #[test]
    fn missing_route_is_labelled_unmatched() {
        let ctx = RequestContext {
            request_id: "id".to_string(),
            route: None,
        };
        assert_eq!(ctx.route_label(), "unmatched");
    }
}
