//! Workflow engine: recorded, parameterized desktop step sequences.
//!
//! ```text
//! workflows_manifest.json ──► WorkflowLoader ──► Workflow (Vec<ActionStep>)
//!                                                    │
//!                          ParameterSet ──► substitute (per step)
//!                                                    │
//!                                           WorkflowExecutor ──► CapabilityRegistry
//!                                                                      │
//!                                                                  AuditLog
//! ```

pub mod executor;
pub mod loader;
pub mod params;
pub mod retry;
pub mod schema;

pub use executor::{
    classify_outcome, RunState, StepOutcome, StepResult, WorkflowExecutor, WorkflowReport,
};
pub use loader::WorkflowLoader;
pub use params::{substitute, ParameterSet};
pub use retry::{PollOutcome, PollPolicy, RetryOutcome, RetryPolicy};
pub use schema::{ActionStep, Manifest, ManifestEntry, Workflow};
