//! Audit log: one JSONL record per capability invocation.
//!
//! - `AuditEntry`: the record written for each invocation
//! - `AuditStatus`: `success | error | not_found | timeout | failed`
//! - `AuditLog`: append-only writer bound to one task log file (or disabled)
//! - `read_entries`: load a task log back for inspection
//!
//! Storage: `<logs_dir>/task_{YYYY-mm-dd_HH-MM-SS}.jsonl`

mod reader;
mod types;
mod writer;

pub use reader::*;
pub use types::*;
pub use writer::*;
