//! deskflow-core: engine for recorded desktop-automation workflows.
//!
//! A workflow is a named list of steps, each naming a capability and its
//! arguments. The engine loads it through a manifest, substitutes run
//! parameters, dispatches every step through the capability registry and
//! records each invocation in a JSONL task log.

pub mod audit;
pub mod capability;
pub mod config;
pub mod error;
pub mod workflow;

pub use audit::{AuditEntry, AuditLog, AuditStatus};
pub use capability::{
    ActionOutput, Capability, CapabilityRegistry, CapabilitySpec, DesktopDriver, HeadlessDriver,
};
pub use config::EngineConfig;
pub use error::{CapabilityError, WorkflowError};
pub use workflow::{ParameterSet, Workflow, WorkflowExecutor, WorkflowLoader};
