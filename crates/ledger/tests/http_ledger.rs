//! HttpLedger against an in-process relayer backed by a MemoryLedger.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use fintrust_ledger::{AuthorizationLedger, HttpLedger, LedgerError, MemoryLedger};
use fintrust_types::{FileHash, FileId, Identity};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct CommitBody {
    file_hash: String,
    party: String,
}

async fn query(
    State(ledger): State<MemoryLedger>,
    Path((hash, party)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let hash = FileHash::from_hex(&hash).map_err(|_| StatusCode::BAD_REQUEST)?;
    let party = Identity::parse(&party).map_err(|_| StatusCode::BAD_REQUEST)?;
    let authorized = ledger
        .query_authorization(&hash, &party)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(json!({ "authorized": authorized })))
}

async fn commit(
    State(ledger): State<MemoryLedger>,
    Json(body): Json<CommitBody>,
) -> Result<Json<Value>, StatusCode> {
    let hash = FileHash::from_hex(&body.file_hash).map_err(|_| StatusCode::BAD_REQUEST)?;
    let party = Identity::parse(&body.party).map_err(|_| StatusCode::BAD_REQUEST)?;
    let receipt = ledger
        .commit_authorization(&hash, &party)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(json!({ "tx_hash": receipt.tx_hash })))
}

async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn spawn_relayer(ledger: MemoryLedger) -> SocketAddr {
    let router = Router::new()
        .route("/authorizations/:hash/:party", get(query))
        .route("/authorizations", post(commit))
        .with_state(ledger);
    spawn_router(router).await
}

fn file_hash(raw: &str) -> FileHash {
    FileId::parse(raw).unwrap().ledger_hash()
}

#[tokio::test]
async fn query_commit_roundtrip_through_relayer() {
    let backing = MemoryLedger::new();
    let addr = spawn_relayer(backing.clone()).await;
    let ledger = HttpLedger::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

    let hash = file_hash("QmFile");
    let party = Identity::parse("XYZ NBFC").unwrap();

    assert!(!ledger.query_authorization(&hash, &party).await.unwrap());

    let receipt = ledger.commit_authorization(&hash, &party).await.unwrap();
    assert!(receipt.tx_hash.starts_with("0x"));
    assert_eq!(receipt.party, party);
    assert!(backing.is_authorized(&hash, &party));

    assert!(ledger.query_authorization(&hash, &party).await.unwrap());
}

#[tokio::test]
async fn upstream_errors_are_classified() {
    let router = Router::new()
        .route(
            "/authorizations/:hash/:party",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route(
            "/authorizations",
            post(|| async { (StatusCode::FORBIDDEN, "caller is not the file owner") }),
        );
    let addr = spawn_router(router).await;
    let ledger = HttpLedger::new(&format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
    let hash = file_hash("QmFile");
    let party = Identity::parse("0xBBB").unwrap();

    assert!(matches!(
        ledger.query_authorization(&hash, &party).await,
        Err(LedgerError::Unavailable(_))
    ));
    match ledger.commit_authorization(&hash, &party).await {
        Err(LedgerError::Rejected(detail)) => assert!(detail.contains("not the file owner")),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_answers_are_protocol_errors() {
    let router = Router::new()
        .route(
            "/authorizations/:hash/:party",
            get(|| async { Json(json!({ "maybe": true })) }),
        )
        .route(
            "/authorizations",
            post(|| async { Json(json!({ "tx_hash": "" })) }),
        );
    let addr = spawn_router(router).await;
    let ledger = HttpLedger::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    let hash = file_hash("QmFile");
    let party = Identity::parse("0xBBB").unwrap();

    assert!(matches!(
        ledger.query_authorization(&hash, &party).await,
        Err(LedgerError::Protocol(_))
    ));
    assert!(matches!(
        ledger.commit_authorization(&hash, &party).await,
        Err(LedgerError::Protocol(_))
    ));
}

#[tokio::test]
async fn unreachable_relayer_is_unavailable() {
    // Bind then drop to obtain a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ledger = HttpLedger::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let result = ledger
        .query_authorization(&file_hash("QmFile"), &Identity::parse("0xBBB").unwrap())
        .await;
    assert!(matches!(result, Err(LedgerError::Unavailable(_))));
}
