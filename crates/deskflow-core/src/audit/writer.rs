//! AuditLog: JSONL append-only writer for task logs.
//!
//! Features:
//! - One full line per `write_all`, opened in append mode
//! - A disabled log turns every append into a no-op
//! - Graceful error handling (never fails the main flow)

use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{AuditEntry, AuditStatus};

/// Log destination for one task run.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    /// Task log file; `None` disables logging
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Append to an existing (or yet to be created) task log file.
    pub fn to_file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// A log that drops every entry.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn from_optional(path: Option<impl AsRef<Path>>) -> Self {
        match path {
            Some(p) => Self::to_file(p),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry as a single JSONL line.
    pub async fn append(&self, entry: &AuditEntry) -> Result<(), AuditWriteError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let mut line = serde_json::to_string(entry)
            .map_err(|e| AuditWriteError::Serialization(e.to_string()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| AuditWriteError::Io(format!("{}: {}", path.display(), e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AuditWriteError::Io(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| AuditWriteError::Io(e.to_string()))?;

        Ok(())
    }

    /// Append an entry, logging errors but never failing.
    pub async fn append_safe(&self, entry: &AuditEntry) {
        if let Err(e) = self.append(entry).await {
            tracing::warn!("[AuditLog] Failed to write audit entry: {}", e);
        }
    }

    /// Record one capability outcome.
    pub async fn log_action(
        &self,
        action: &str,
        parameters: &Value,
        status: AuditStatus,
        result: impl Into<Value>,
    ) {
        if !self.is_enabled() {
            return;
        }
        let entry = AuditEntry::now(action, parameters.clone(), status, result);
        self.append_safe(&entry).await;
    }
}

/// Create a fresh, empty task log under `logs_dir` and return its path.
pub async fn start_task_log(logs_dir: impl AsRef<Path>) -> Result<PathBuf, AuditWriteError> {
    let logs_dir = logs_dir.as_ref();
    fs::create_dir_all(logs_dir)
        .await
        .map_err(|e| AuditWriteError::Io(format!("Failed to create logs dir: {}", e)))?;

    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let path = logs_dir.join(format!("task_{}.jsonl", stamp));

    fs::write(&path, b"")
        .await
        .map_err(|e| AuditWriteError::Io(format!("{}: {}", path.display(), e)))?;

    Ok(path)
}

/// Error type for audit log writes.
#[derive(Debug, thiserror::Error)]
pub enum AuditWriteError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}
