//! File registration, retrieval and grant endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as AxumPath, Query, State};
use axum::Json;
use fintrust_files::FileRecord;
use fintrust_gate::{CacheUpdate, FileView};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::server::{ApiError, SharedState};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterFileRequest {
    /// Owner wallet identity.
    pub owner: String,

    pub file_name: String,

    /// Content pointer, e.g. an IPFS CID.
    #[serde(alias = "cid")]
    pub content_ref: String,
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub success: bool,
    pub file: FileRecord,
}

#[derive(Debug, Deserialize)]
pub struct RequesterQuery {
    #[serde(default)]
    pub requester: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileViewResponse {
    pub success: bool,
    pub file: FileView,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizeRequest {
    /// Caller claiming ownership of the file.
    pub owner: String,
    pub third_party: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub success: bool,
    pub file_id: String,
    pub third_party: String,
    pub file_hash: String,
    pub tx_hash: String,
    pub cache: CacheUpdate,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub success: bool,
    pub owner: String,
    pub files: Vec<FileRecord>,
}

/// POST /api/files
pub(crate) async fn handle_register_file(
    State(state): State<SharedState>,
    body: Result<Json<RegisterFileRequest>, JsonRejection>,
) -> Result<Json<FileResponse>, ApiError> {
    let Json(request) = body?;
    let file = state
        .gate
        .register_file(&request.owner, &request.file_name, &request.content_ref)
        .await?;
    Ok(Json(FileResponse {
        success: true,
        file,
    }))
}

/// GET /api/files/:id?requester=
pub(crate) async fn handle_get_file(
    State(state): State<SharedState>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<RequesterQuery>,
) -> Result<Json<FileViewResponse>, ApiError> {
    let requester = query.requester.unwrap_or_default();
    debug!("File {} requested by {}", id, requester);
    let file = state.gate.fetch_file(&id, &requester).await?;
    Ok(Json(FileViewResponse {
        success: true,
        file,
    }))
}

/// POST /api/files/:id/authorize
pub(crate) async fn handle_authorize(
    State(state): State<SharedState>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let Json(request) = body?;
    let committed = state
        .gate
        .authorize_third_party(&id, &request.owner, &request.third_party)
        .await?;
    let receipt = committed.receipt;
    Ok(Json(AuthorizeResponse {
        success: true,
        file_id: id,
        third_party: receipt.party.to_string(),
        file_hash: receipt.file_hash.to_hex(),
        tx_hash: receipt.tx_hash,
        cache: committed.cache,
    }))
}

/// GET /api/files/user/:owner
pub(crate) async fn handle_list_files(
    State(state): State<SharedState>,
    AxumPath(owner): AxumPath<String>,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.gate.list_files(&owner).await?;
    Ok(Json(FileListResponse {
        success: true,
        owner: owner.trim().to_ascii_lowercase(),
        files,
    }))
}
