//! Axum binding for the dispatcher.
//!
//! Maps a POST route to [`Dispatcher::handle_request`], passing the raw
//! body bytes through untouched so signatures verify against exactly what
//! the platform sent.
//!
//! | outcome                 | status |
//! |-------------------------|--------|
//! | `Success`               | 200    |
//! | `SignatureInvalid`      | 401    |
//! | `NoEventHeader`         | 422    |
//! | `MalformedPayload`      | 422    |
//! | `PartialHandlerFailure` | 400    |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use crate::dispatcher::Dispatcher;
use crate::error::DeliveryOutcome;

/// Router serving `dispatcher` at `path`.
pub fn webhook_router(dispatcher: Arc<Dispatcher>, path: &str) -> Router {
    Router::new()
        .route(path, post(webhook_handler))
        .with_state(dispatcher)
}

async fn webhook_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let pairs: Vec<(&str, &str)> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();

    let outcome = dispatcher.handle_request(pairs, &body).await;
    outcome_response(&outcome)
}

fn outcome_response(outcome: &DeliveryOutcome) -> Response {
    let status = StatusCode::from_u16(outcome.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = if outcome.is_success() {
        json!({ "status": "success" })
    } else {
        json!({ "status": "error", "detail": outcome.to_string() })
    };

    (status, Json(body)).into_response()
}
