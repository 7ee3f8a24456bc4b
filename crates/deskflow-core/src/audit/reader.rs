//! Read task logs back from disk.

use std::collections::BTreeMap;
use std::path::Path;

use super::{AuditEntry, AuditStatus};

/// Load every well-formed entry of a task log, in file order.
///
/// Lines that fail to parse are skipped.
pub async fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditReadError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AuditReadError::Io(format!("Failed to read '{}': {}", path.display(), e)))?;

    let entries = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("[AuditReader] Skipping malformed line: {}", e);
                None
            }
        })
        .collect();

    Ok(entries)
}

/// Entry count per status, in a stable order.
pub fn count_by_status(entries: &[AuditEntry]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.status.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Entries whose status is anything but `success`.
pub fn non_success(entries: &[AuditEntry]) -> impl Iterator<Item = &AuditEntry> {
    entries.iter().filter(|e| e.status != AuditStatus::Success)
}

#[derive(Debug, thiserror::Error)]
pub enum AuditReadError {
    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.jsonl");
        let good = serde_json::to_string(&AuditEntry::now(
            "type_text",
            serde_json::json!({ "text": "hi" }),
            AuditStatus::Success,
            "Typed text: hi",
        ))
        .unwrap();
        tokio::fs::write(&path, format!("{}\nnot json\n\n{}\n", good, good))
            .await
            .unwrap();

        let entries = read_entries(&path).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(count_by_status(&entries).get("success"), Some(&2));
        assert_eq!(non_success(&entries).count(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_entries(dir.path().join("missing.jsonl")).await.is_err());
    }

    #[tokio::test]
    async fn test_offsetless_timestamps_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.jsonl");
        let line = r#"{"timestamp": "2024-05-01T12:00:00.123456", "action": "wait", "parameters": {"seconds": 1}, "status": "success", "result": "Waited for 1 seconds."}"#;
        tokio::fs::write(&path, format!("{}\n", line)).await.unwrap();

        let entries = read_entries(&path).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "wait");
        assert_eq!(
            entries[0].timestamp.format("%H:%M:%S").to_string(),
            "12:00:00"
        );
    }
}
