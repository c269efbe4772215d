use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
    Json, Router,
};
use http::StatusCode;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    constants::headers::REQUEST_ID,
    errors::ErrorBody,
    routing::FrozenRouter,
    utils::correlation_id,
};

pub struct AppState {
    pub router: FrozenRouter,
    pub max_body_size: usize,
}

/// Mounts the frozen router as the fallback of an axum app.
///
/// Bodies are buffered up to `max_body_size`, then the synchronous dispatch
/// runs on the blocking pool so handlers may block freely.
pub fn create_app(router: FrozenRouter, max_body_size: usize) -> Router {
    let state = Arc::new(AppState {
        router,
        max_body_size,
    });

    Router::new()
        .fallback(dispatch_handler)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let uuid = Uuid::new_v4().to_string();
                let request_id = request
                    .headers()
                    .get(REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or(uuid.as_str());

                tracing::error_span!(
                    "request",
                    id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
}

async fn dispatch_handler(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(uri = %parts.uri, error = %err, "failed to buffer request body");
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large or unreadable");
        }
    };

    let req = http::Request::from_parts(parts, bytes);
    let router = state.router.clone();
    match tokio::task::spawn_blocking(move || router.dispatch(req)).await {
        Ok(response) => response.map(Body::from),
        Err(err) => {
            // a panic escaped the router, i.e. no recover middleware installed
            let error_id = correlation_id();
            error!(error_id = %error_id, error = %err, "dispatch task failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Something went wrong. Error ID: {error_id}"),
            )
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}
