//! Third-party registration and credentialed file access.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use fintrust_gate::IssuedCredential;
use serde::Deserialize;
use tracing::debug;

use crate::files::FileViewResponse;
use crate::server::{ApiError, SharedState};

pub const THIRD_PARTY_ID_HEADER: &str = "x-third-party-id";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterThirdPartyRequest {
    pub third_party_id: String,
    pub name: String,
}

/// POST /api/third-party/register
///
/// The API key in the response is not retrievable again.
pub(crate) async fn handle_register_third_party(
    State(state): State<SharedState>,
    body: Result<Json<RegisterThirdPartyRequest>, JsonRejection>,
) -> Result<Json<IssuedCredential>, ApiError> {
    let Json(request) = body?;
    let issued = state
        .registry
        .register(&request.third_party_id, &request.name)?;
    Ok(Json(issued))
}

/// GET /api/third-party/files/:id
///
/// Requires a ledger grant for the authenticated party, even when the party
/// id matches the file owner.
pub(crate) async fn handle_third_party_file(
    State(state): State<SharedState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<FileViewResponse>, ApiError> {
    let (party_id, api_key) = credentials_from_headers(&headers)?;
    let party = state.registry.authenticate(party_id, api_key)?;
    debug!("Third party {} requested file {}", party, id);

    let file = state.gate.fetch_granted_file(&id, party.as_str()).await?;
    Ok(Json(FileViewResponse {
        success: true,
        file,
    }))
}

fn credentials_from_headers(headers: &HeaderMap) -> Result<(&str, &str), ApiError> {
    let party_id = headers
        .get(THIRD_PARTY_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing X-Third-Party-Id header"))?;

    let api_key = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer API key"))?;

    Ok((party_id, api_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn credentials_require_both_headers() {
        let mut headers = HeaderMap::new();
        assert!(credentials_from_headers(&headers).is_err());

        headers.insert(THIRD_PARTY_ID_HEADER, HeaderValue::from_static("xyz-nbfc"));
        assert!(credentials_from_headers(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(credentials_from_headers(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(
            credentials_from_headers(&headers).unwrap(),
            ("xyz-nbfc", "abc123")
        );
    }
}
