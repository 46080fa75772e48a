use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::audit::AuditEntry;

pub const API_LOG_TABLE: &str = "api_logs";

/// Append-only destination for audit rows.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn insert_resource_log(&self, table: &'static str, entry: &AuditEntry) -> anyhow::Result<()>;
    async fn insert_api_log(&self, entry: &AuditEntry) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<dyn AuditSink> {
        &self.sink
    }

    /// Writes the resource row (when the entry names a table) and always the
    /// `api_logs` row. Per-table failures are collected; with `ignore_failure`
    /// they are only logged.
    pub async fn record(&self, entry: &AuditEntry, ignore_failure: bool) -> Result<(), AppError> {
        let mut failures: Vec<(&'static str, String)> = Vec::new();

        if let Some(table) = entry.table {
            if let Err(e) = self.sink.insert_resource_log(table, entry).await {
                failures.push((table, e.to_string()));
            }
        }
        if let Err(e) = self.sink.insert_api_log(entry).await {
            failures.push((API_LOG_TABLE, e.to_string()));
        }

        if failures.is_empty() {
            tracing::debug!(
                resource = entry.resource_or_unknown(),
                operation = entry.operation.as_str(),
                status = entry.status.as_str(),
                "audit recorded"
            );
            return Ok(());
        }

        for (table, message) in &failures {
            tracing::error!(table, operation = entry.operation.as_str(), "failed to write audit log: {}", message);
        }
        if ignore_failure {
            return Ok(());
        }

        let details = failures
            .iter()
            .map(|(table, message)| format!("{}: {}", table, message))
            .collect::<Vec<_>>()
            .join(" | ");
        Err(AppError::audit(details))
    }

    /// Fires the write on a Tokio task without blocking the response path.
    pub fn record_detached(&self, entry: AuditEntry) {
        let recorder = self.clone();
        tokio::spawn(async move {
            let _ = recorder.record(&entry, true).await;
        });
    }
}
