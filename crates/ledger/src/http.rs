//! Ledger client for an HTTP relayer in front of the authorization contract.
//!
//! Relayer API:
//! - `GET  {base}/authorizations/{file_hash}/{party}` -> `{"authorized": bool}`
//! - `POST {base}/authorizations` `{"file_hash", "party"}` -> `{"tx_hash"}`

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fintrust_types::{FileHash, Identity};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{AuthorizationLedger, TransactionReceipt};

#[derive(Debug, Deserialize)]
struct QueryResponse {
    authorized: bool,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    file_hash: String,
    party: &'a str,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    tx_hash: String,
}

pub struct HttpLedger {
    client: Client,
    base: Url,
}

impl HttpLedger {
    /// Build a client for the relayer at `base_url`.
    ///
    /// `request_timeout` bounds each HTTP exchange; the gate applies its own
    /// deadline on top.
    pub fn new(base_url: &str, request_timeout: Duration) -> LedgerResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| LedgerError::Protocol(format!("invalid relayer URL {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(LedgerError::Protocol(format!(
                "relayer URL {base_url} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Protocol(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> LedgerResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| LedgerError::Protocol("relayer URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Map a non-success relayer status to a ledger error.
fn status_error(status: StatusCode, body: &str) -> LedgerError {
    let detail = format!("relayer returned {status}: {}", body.trim());
    if status.is_client_error() {
        LedgerError::Rejected(detail)
    } else {
        LedgerError::Unavailable(detail)
    }
}

#[async_trait]
impl AuthorizationLedger for HttpLedger {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn query_authorization(
        &self,
        file_hash: &FileHash,
        party: &Identity,
    ) -> LedgerResult<bool> {
        let url = self.endpoint(&["authorizations", &file_hash.to_hex(), party.as_str()])?;
        debug!("ledger query GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("ledger query for {} failed with {}", file_hash, status);
            // A query has no "rejected" outcome: anything but a clear answer is
            // the ledger being unable to confirm.
            return Err(LedgerError::Unavailable(format!(
                "relayer returned {status}: {}",
                body.trim()
            )));
        }

        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.authorized)
    }

    async fn commit_authorization(
        &self,
        file_hash: &FileHash,
        party: &Identity,
    ) -> LedgerResult<TransactionReceipt> {
        let url = self.endpoint(&["authorizations"])?;
        debug!("ledger commit POST {} for {}", url, file_hash);

        let request = CommitRequest {
            file_hash: file_hash.to_hex(),
            party: party.as_str(),
        };
        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let parsed: CommitResponse = response.json().await?;
        if parsed.tx_hash.trim().is_empty() {
            return Err(LedgerError::Protocol(
                "relayer returned an empty transaction hash".to_string(),
            ));
        }

        Ok(TransactionReceipt {
            tx_hash: parsed.tx_hash,
            file_hash: *file_hash,
            party: party.clone(),
            committed_at: Utc::now(),
        })
    }
}
