use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fintrust_gate::{AccessGate, CredentialError, ErrorKind, GateError, ThirdPartyRegistry};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::files::{handle_authorize, handle_get_file, handle_list_files, handle_register_file};
use crate::third_party::{handle_register_third_party, handle_third_party_file};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
    pub registry: Arc<ThirdPartyRegistry>,
    pub node_id: String,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(gate: Arc<AccessGate>, registry: Arc<ThirdPartyRegistry>, node_id: String) -> Self {
        Self {
            gate,
            registry,
            node_id,
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn record_request(&self) {
        self.req_count.fetch_add(1, Ordering::Relaxed);
    }

    fn request_total(&self) -> u64 {
        self.req_count.load(Ordering::Relaxed) as u64
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub(crate) type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    node_id: String,
    uptime_secs: u64,
    ledger: &'static str,
    file_count: u64,
    req_total: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
}

#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub(crate) fn new<S: Into<String>>(status: StatusCode, code: &'static str, message: S) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub(crate) fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", message)
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            success: false,
            error: self.message,
            code: self.code,
        });
        (self.status, payload).into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::Forbidden | ErrorKind::NotAuthorized | ErrorKind::LedgerUnavailable => {
                StatusCode::FORBIDDEN
            }
            ErrorKind::LedgerCommitFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::MetadataUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", err);
        }
        Self::new(status, kind.code(), err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidIdentifier(_) | CredentialError::InvalidName(_) => {
                Self::bad_request(err.to_string())
            }
            CredentialError::AlreadyRegistered(_) => {
                Self::new(StatusCode::CONFLICT, "already_exists", err.to_string())
            }
            CredentialError::InvalidApiKey => Self::unauthorized(err.to_string()),
            CredentialError::Hashing(_) => {
                warn!("Credential failure: {}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "credential processing failed",
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("FinTrust API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("RPC server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {addr}"))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/files", post(handle_register_file))
        .route("/api/files/user/:owner", get(handle_list_files))
        .route("/api/files/:id", get(handle_get_file))
        .route("/api/files/:id/authorize", post(handle_authorize))
        .route("/api/third-party/register", post(handle_register_third_party))
        .route("/api/third-party/files/:id", get(handle_third_party_file))
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn count_requests(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    state.record_request();
    next.run(request).await
}

async fn handle_health(State(state): State<SharedState>) -> Result<Json<HealthResponse>, ApiError> {
    let file_count = state.gate.file_count().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        node_id: state.node_id.clone(),
        uptime_secs: state.uptime_seconds(),
        ledger: state.gate.ledger_name(),
        file_count,
        req_total: state.request_total(),
    }))
}
