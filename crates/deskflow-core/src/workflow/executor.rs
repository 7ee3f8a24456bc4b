//! Workflow Executor: runs a loaded workflow step by step.
//!
//! For every step the executor:
//! 1. Substitutes the run's parameters into the step arguments
//! 2. Dispatches the step through the capability registry
//! 3. Classifies the result and either continues or aborts
//!
//! Unknown actions, parameter-shape mismatches and classified failures abort
//! the run; every other result is printed and execution moves on.

use serde_json::{Map, Value};

use super::params::{substitute, ParameterSet};
use super::schema::Workflow;
use crate::audit::AuditLog;
use crate::capability::{ActionOutput, CapabilityRegistry, Dispatch, FailureSignal};
use crate::error::WorkflowError;

/// Substrings that mark a classified result text as a failure.
pub const FAILURE_MARKERS: &[&str] = &["not found", "failed", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    /// Zero-based index of the step being executed
    Running(usize),
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Failed,
}

/// Decide whether a step result aborts the run.
///
/// Only capabilities that declare [`FailureSignal::ResultText`] are
/// classified; their message is searched case-insensitively for
/// [`FAILURE_MARKERS`].
pub fn classify_outcome(signal: FailureSignal, output: &ActionOutput) -> StepOutcome {
    match signal {
        FailureSignal::None => StepOutcome::Continue,
        FailureSignal::ResultText => {
            let message = output.message.to_lowercase();
            if FAILURE_MARKERS.iter().any(|m| message.contains(m)) {
                StepOutcome::Failed
            } else {
                StepOutcome::Continue
            }
        }
    }
}

/// Result of one executed step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// One-based position in the workflow
    pub step: usize,
    pub action: String,
    pub output: ActionOutput,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub workflow_name: String,
    pub steps: Vec<StepResult>,
}

impl WorkflowReport {
    /// Steps whose own status was not `success`, even though the run went on.
    pub fn unsuccessful_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.output.is_success())
    }
}

pub struct WorkflowExecutor {
    registry: CapabilityRegistry,
    log: AuditLog,
    state: RunState,
}

impl WorkflowExecutor {
    pub fn new(registry: CapabilityRegistry, log: AuditLog) -> Self {
        Self {
            registry,
            log,
            state: RunState::Pending,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    /// Execute every step of `workflow` in order.
    pub async fn execute(
        &mut self,
        workflow: &Workflow,
        params: &ParameterSet,
    ) -> Result<WorkflowReport, WorkflowError> {
        println!("Executing workflow '{}'...", workflow.name);
        tracing::debug!(
            "[WorkflowExecutor] '{}': {} step(s), {} parameter(s)",
            workflow.name,
            workflow.steps.len(),
            params.len()
        );

        let mut results = Vec::with_capacity(workflow.steps.len());

        for (i, step) in workflow.steps.iter().enumerate() {
            self.state = RunState::Running(i);
            let args = substitute(&step.params, params);

            let result = match self.run_step(i + 1, &step.action, args).await {
                Ok(result) => result,
                Err(e) => {
                    self.state = RunState::Aborted;
                    tracing::warn!("[WorkflowExecutor] '{}' aborted: {}", workflow.name, e);
                    return Err(e);
                }
            };

            println!(
                "Workflow step [{}]: {}",
                result.action, result.output.message
            );
            results.push(result);
        }

        self.state = RunState::Completed;
        println!("Workflow '{}' finished.", workflow.name);

        Ok(WorkflowReport {
            workflow_name: workflow.name.clone(),
            steps: results,
        })
    }

    /// Run a single action outside a workflow, classified like a workflow step.
    pub async fn execute_action(
        &mut self,
        action: &str,
        params: Map<String, Value>,
    ) -> Result<StepResult, WorkflowError> {
        self.state = RunState::Running(0);
        match self.run_step(1, action, params).await {
            Ok(result) => {
                self.state = RunState::Completed;
                Ok(result)
            }
            Err(e) => {
                self.state = RunState::Aborted;
                Err(e)
            }
        }
    }

    async fn run_step(
        &self,
        step: usize,
        action: &str,
        params: Map<String, Value>,
    ) -> Result<StepResult, WorkflowError> {
        let Dispatch {
            action,
            failure_signal,
            output,
        } = self.registry.dispatch(action, params, &self.log).await?;

        if classify_outcome(failure_signal, &output) == StepOutcome::Failed {
            return Err(WorkflowError::StepFailed {
                step,
                action,
                message: output.message,
            });
        }

        Ok(StepResult {
            step,
            action,
            output,
        })
    }
}
