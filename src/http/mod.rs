//! HTTP Surface
//!
//! axum handlers for the two exposed operations plus a metadata read and
//! a health probe. Handlers translate the error taxonomy into HTTP
//! statuses: input errors map to 4xx, retryable failures to 5xx.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::EvidenceError;
use crate::ledger::client::DigestProvider;
use crate::objectstore::ObjectStore;
use crate::service::VerificationService;

pub struct AppState<P: DigestProvider> {
    pub service: Arc<VerificationService<P>>,
    pub object_store: Arc<ObjectStore>,
    pub signed_url_ttl_secs: i64,
}

impl<P: DigestProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            object_store: Arc::clone(&self.object_store),
            signed_url_ttl_secs: self.signed_url_ttl_secs,
        }
    }
}

pub fn router<P: DigestProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(handle_ingest))
        .route("/evidence/:id", get(handle_get_evidence))
        .route("/evidence/:id/verification", get(handle_verify))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "evidence-ledger",
        "timestamp": chrono::Utc::now()
    }))
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    records: Vec<Value>,
}

async fn handle_ingest<P: DigestProvider>(
    State(state): State<AppState<P>>,
    Json(request): Json<IngestRequest>,
) -> (StatusCode, Json<Value>) {
    info!("Received ingest batch of {} records", request.records.len());
    let summary = state.service.ingest(request.records).await;
    (StatusCode::OK, Json(json!(summary)))
}

async fn handle_verify<P: DigestProvider>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let id = id.trim();
    if id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "evidence id must not be empty"})),
        );
    }

    match state.service.verify(id).await {
        Ok(result) => (StatusCode::OK, Json(json!(result))),
        Err(e) => error_response(&e),
    }
}

async fn handle_get_evidence<P: DigestProvider>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let id = id.trim();
    if id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "evidence id must not be empty"})),
        );
    }

    match state.service.database().get_by_id(id).await {
        Ok(Some(record)) => {
            let payload_url = record
                .object_locator
                .as_ref()
                .map(|l| state.object_store.signed_url(l, state.signed_url_ttl_secs));
            let mut body = json!(record);
            if let Some(url) = payload_url {
                body["payloadUrl"] = json!(url);
            }
            (StatusCode::OK, Json(body))
        }
        Ok(None) => error_response(&EvidenceError::NotFound(id.to_string())),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &EvidenceError) -> (StatusCode, Json<Value>) {
    let status = match err {
        EvidenceError::NotFound(_) => StatusCode::NOT_FOUND,
        EvidenceError::MalformedRecord(_)
        | EvidenceError::MalformedProof(_)
        | EvidenceError::InvalidLocator(_) => StatusCode::BAD_REQUEST,
        EvidenceError::Transient(_) | EvidenceError::ConcurrentUpdate(_) => {
            StatusCode::BAD_GATEWAY
        }
        EvidenceError::DatabaseError(_) | EvidenceError::ConfigError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        warn!("Request failed: {}", err);
    }

    (
        status,
        Json(json!({
            "error": err.to_string(),
            "retryable": err.is_retryable()
        })),
    )
}
