//! Audit trail for access decisions and grants.
//!
//! Sinks are best effort: a failing sink is logged and never changes the
//! outcome returned to the caller.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fintrust_types::{FileId, Identity};
use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    FileRegistered,
    AccessGranted,
    AccessDenied,
    /// Denied because the ledger could not be consulted.
    AccessUnverified,
    GrantCommitted,
    GrantForbidden,
    GrantFailed,
}

impl AuditEventKind {
    pub fn severity(&self) -> &'static str {
        match self {
            AuditEventKind::FileRegistered | AuditEventKind::AccessGranted => "info",
            AuditEventKind::GrantCommitted => "info",
            AuditEventKind::AccessDenied => "low",
            AuditEventKind::AccessUnverified | AuditEventKind::GrantFailed => "medium",
            AuditEventKind::GrantForbidden => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: AuditEventKind,
    pub file_id: FileId,
    /// Requester or caller.
    pub actor: Identity,
    /// Third party a grant was made for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Identity>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind, file_id: &FileId, actor: &Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            file_id: file_id.clone(),
            actor: actor.clone(),
            subject: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_subject(mut self, subject: &Identity) -> Self {
        self.subject = Some(subject.clone());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<()>;
}

fn trace_event(entry: &str, severity: &str) {
    match severity {
        "critical" | "high" => error!("Audit event: {}", entry),
        "medium" => warn!("Audit event: {}", entry),
        _ => info!("Audit event: {}", entry),
    }
}

/// Emits audit events through `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        let entry = serde_json::to_string(event)?;
        trace_event(&entry, event.kind.severity());
        Ok(())
    }
}

/// Appends one JSON object per line to a file, then traces the event.
pub struct JsonlAuditSink {
    log_file: Mutex<std::fs::File>,
    log_path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            log_file: Mutex::new(log_file),
            log_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        let entry = serde_json::to_string(event)?;

        {
            let mut file = self.log_file.lock().await;
            writeln!(file, "{}", entry)?;
            file.flush()?;
        }

        trace_event(&entry, event.kind.severity());
        Ok(())
    }
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: SyncMutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<AuditEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
