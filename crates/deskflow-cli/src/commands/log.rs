//! `deskflow log`: inspect task logs written by earlier runs.

use std::path::Path;

use deskflow_core::audit::{count_by_status, non_success, read_entries, AuditEntry};

use super::truncate;

/// Print the entries of a task log, optionally only the non-success ones.
pub async fn show(path: &Path, failures_only: bool) -> Result<(), String> {
    let entries = read_entries(path).await.map_err(|e| e.to_string())?;

    let shown: Vec<&AuditEntry> = if failures_only {
        non_success(&entries).collect()
    } else {
        entries.iter().collect()
    };

    for entry in &shown {
        let result = match &entry.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!(
            "{}  {:<9}  {:<24}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.status,
            entry.action,
            truncate(&result, 80)
        );
    }

    if shown.is_empty() {
        println!("No entries in '{}'", path.display());
    }
    Ok(())
}

/// Print per-status counts for a task log.
pub async fn summary(path: &Path) -> Result<(), String> {
    let entries = read_entries(path).await.map_err(|e| e.to_string())?;

    println!("{} entr(ies) in '{}'", entries.len(), path.display());
    for (status, count) in count_by_status(&entries) {
        println!("   {:<9} {}", status, count);
    }
    if let Some(verdict) = entries.iter().rev().find(|e| e.action == "task_verdict") {
        println!("   Verdict: {}", verdict.status);
    }
    Ok(())
}
