//! The demo host's router and request handlers, factored out of
//! `src/bin/handoff_demo.rs` so integration tests can drive the full
//! authentication pipeline and StoreQuery dispatch with
//! `tower::ServiceExt::oneshot`, the way the teacher's own integration
//! tests build a `Router` and drive it directly (`tests/s3_api_test.rs`).
//!
//! This is explicitly NOT a reimplementation of the S3 REST surface: every
//! method on every path goes through one fallback handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::engine::HandoffEngine;
use crate::metrics::Metrics;
use crate::storequery::memory::{InMemoryBucketIndex, InMemoryMultipartTable};
use crate::storequery::{self, Registry as StoreQueryRegistry};
use crate::types::{HandlerContext, RequestSnapshot};
use crate::Verdict;

pub struct AppState {
    pub engine: HandoffEngine,
    pub registry: StoreQueryRegistry,
    pub bucket_index: InMemoryBucketIndex,
    pub multipart_table: InMemoryMultipartTable,
    pub metrics: Option<Arc<Metrics>>,
}

/// Build the router. `/metrics` is only mounted when `state.metrics` is
/// `Some` — the caller decides that by whether it constructed `AppState`
/// with metrics enabled.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().route("/health", get(health_check));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.fallback(handle_request).with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(metrics) => match metrics.encode() {
            Ok(buffer) => ([("content-type", metrics.content_type())], buffer).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to encode metrics: {e}")).into_response(),
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Single entry point exercising the library: any request either carries
/// `x-rgw-storequery` (dispatched to the side-channel) or is authenticated
/// through the Handoff Engine.
async fn handle_request(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    method: axum::http::Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (bucket, object_key) = split_path(uri.path());
    let query = parse_query(uri.query().unwrap_or(""));

    if let Some(raw) = headers.get("x-rgw-storequery") {
        let context = if object_key.is_empty() {
            if bucket.is_empty() {
                HandlerContext::Service
            } else {
                HandlerContext::Bucket
            }
        } else {
            HandlerContext::Object
        };

        let result =
            storequery::dispatch(raw.as_bytes(), context, &bucket, &object_key, &state.registry, &state.bucket_index, &state.multipart_table)
                .await;

        if let Some(metrics) = &state.metrics {
            let command_name = storequery::parse_header(raw.as_bytes()).map(|c| c.name).unwrap_or_default();
            metrics.record_storequery_command(&command_name, result.is_ok());
        }

        return match result {
            Ok(value) => (StatusCode::OK, axum::Json(value)).into_response(),
            Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };
    }

    let snapshot = build_snapshot(&headers, &uri, method.as_str(), &bucket, &object_key, query, body);
    let verdict = state.engine.authenticate(&snapshot, CancellationToken::new()).await;

    match verdict {
        Verdict::Ok(ok) => (StatusCode::OK, axum::Json(serde_json::json!({ "user_id": ok.user_id }))).into_response(),
        Verdict::Err(err) => {
            warn!(code = err.code.as_str(), "handoff: request denied");
            let status = StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, axum::Json(serde_json::json!({ "code": err.code.as_str(), "message": err.message }))).into_response()
        }
    }
}

fn split_path(path: &str) -> (String, String) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((bucket, key)) => (bucket.to_string(), key.to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn build_snapshot(
    headers: &HeaderMap,
    uri: &Uri,
    method: &str,
    bucket: &str,
    object_key: &str,
    query: HashMap<String, String>,
    body: Bytes,
) -> RequestSnapshot {
    let mut env = HashMap::new();
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            env.insert(RequestSnapshot::env_key_for_header(name.as_str()), value.to_string());
        }
    }

    let access_key_id = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_access_key_id)
        .unwrap_or_default();

    RequestSnapshot {
        transaction_id: Uuid::new_v4().to_string(),
        string_to_sign: body.to_vec(),
        access_key_id,
        session_token: query.get("X-Amz-Security-Token").cloned(),
        method: method.to_string(),
        path: uri.path().to_string(),
        bucket: bucket.to_string(),
        object_key: object_key.to_string(),
        env,
        query,
    }
}

/// Best-effort access-key-id extraction for the demo router's logging and
/// metrics context; SIN re-derives the authoritative value from the same
/// header during normalization.
fn extract_access_key_id(header: &str) -> Option<String> {
    if let Some(rest) = header.strip_prefix("AWS ") {
        return rest.split(':').next().map(str::to_string);
    }
    if header.starts_with("AWS4-HMAC-SHA256") {
        let credential = header.split(',').find_map(|part| part.trim().strip_prefix("Credential="))?;
        return credential.split('/').next().map(str::to_string);
    }
    None
}
