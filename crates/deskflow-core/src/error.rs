//! Core error types for the deskflow engine.
//!
//! `WorkflowError` is the only error that aborts a run. Capability failures
//! (`CapabilityError`) are absorbed by the dispatcher and turned into an
//! `error` result, so they never reach the executor as `Err`.

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow '{0}' not found in manifest")]
    WorkflowNotFound(String),

    #[error("Failed to load workflow: {0}")]
    WorkflowLoadError(String),

    #[error("Action '{0}' is not a registered capability")]
    UnknownAction(String),

    #[error("Invalid parameters for '{action}': {reason}")]
    InvalidParams { action: String, reason: String },

    #[error("Step {step} [{action}] failed: {message}")]
    StepFailed {
        step: usize,
        action: String,
        message: String,
    },

    #[error("Invalid parameter set: {0}")]
    InvalidParameterSet(String),
}

/// Failure raised inside a capability or the driver beneath it.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("desktop driver unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Driver(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task log: {0}")]
    Audit(#[from] crate::audit::AuditWriteError),
}
