//! axum adapter: maps HTTP requests onto [`InboundCall`] and outcomes back.

use crate::domain::{CallBody, DispatchOutcome, HttpMethod, InboundCall};
use crate::ports::CallbackApi;
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Default request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Build a router serving GET (handshake) and POST (messages) on `path`.
pub fn router(api: Arc<dyn CallbackApi>, path: &str, max_body_bytes: usize) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    Router::new()
        .route(path, get(handle_callback).post(handle_callback))
        .layer(middleware)
        .with_state(api)
}

async fn handle_callback(
    State(api): State<Arc<dyn CallbackApi>>,
    method: Method,
    Query(pairs): Query<Vec<(String, String)>>,
    body: String,
) -> Response {
    let call = InboundCall {
        method: HttpMethod::parse(method.as_str()),
        query: pairs.into_iter().collect(),
        body: CallBody::from(body),
    };

    match api.handle(call).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => {
            error!(error = %e, status = e.status(), "Callback dispatch failed");
            outcome_response(DispatchOutcome::internal_error())
        }
    }
}

fn outcome_response(outcome: DispatchOutcome) -> Response {
    let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = if outcome.body.starts_with("<xml>") {
        "application/xml"
    } else {
        "text/plain; charset=utf-8"
    };
    (status, [(header::CONTENT_TYPE, content_type)], outcome.body).into_response()
}
