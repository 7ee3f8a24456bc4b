//! CLI command implementations.
//!
//! Each submodule corresponds to a group of CLI commands and drives the
//! deskflow-core engine through an [`Engine`].

pub mod action;
pub mod log;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use deskflow_core::{AuditLog, CapabilityRegistry, DesktopDriver, EngineConfig};

/// Everything a command needs: resolved paths, the capability registry and
/// the task log destination of this invocation.
#[derive(Clone)]
pub struct Engine {
    pub config: EngineConfig,
    pub registry: CapabilityRegistry,
    pub log: AuditLog,
}

/// Build an [`Engine`] with every built-in capability bound to `driver`.
///
/// Without `log_file_path`, audit logging is disabled for this invocation.
pub fn init_engine(
    config: EngineConfig,
    log_file_path: Option<PathBuf>,
    driver: Arc<dyn DesktopDriver>,
) -> Engine {
    let registry = CapabilityRegistry::with_builtins(driver, &config);
    let log = AuditLog::from_optional(log_file_path);
    if let Some(path) = log.path() {
        tracing::info!("[deskflow] Appending audit entries to {}", path.display());
    }
    Engine {
        config,
        registry,
        log,
    }
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
