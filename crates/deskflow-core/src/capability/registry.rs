//! Capability registry and dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{ActionOutput, Call, Capability, CapabilitySpec, FailureSignal};
use crate::audit::{AuditLog, AuditStatus};
use crate::error::WorkflowError;

/// Outcome of dispatching one action.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub action: String,
    pub failure_signal: FailureSignal,
    pub output: ActionOutput,
}

/// Explicit name → capability registry, populated at start-up.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its declared name, replacing any previous one.
    pub fn register(&mut self, capability: impl Capability + 'static) {
        let name = capability.spec().name.to_string();
        if self
            .capabilities
            .insert(name.clone(), Arc::new(capability))
            .is_some()
        {
            tracing::debug!("[CapabilityRegistry] Replaced capability '{}'", name);
        }
    }

    pub fn contains(&self, action: &str) -> bool {
        self.capabilities.contains_key(action)
    }

    pub fn spec(&self, action: &str) -> Option<&CapabilitySpec> {
        self.capabilities.get(action).map(|c| c.spec())
    }

    /// Registered specs sorted by name.
    pub fn specs(&self) -> Vec<&CapabilitySpec> {
        let mut specs: Vec<_> = self.capabilities.values().map(|c| c.spec()).collect();
        specs.sort_by_key(|s| s.name);
        specs
    }

    /// Invoke `action` with `params`.
    ///
    /// Only lookup and calling-convention failures are returned as `Err`;
    /// errors raised inside the capability come back as an `error` output.
    pub async fn dispatch(
        &self,
        action: &str,
        mut params: Map<String, Value>,
        log: &AuditLog,
    ) -> Result<Dispatch, WorkflowError> {
        let capability = self
            .capabilities
            .get(action)
            .ok_or_else(|| WorkflowError::UnknownAction(action.to_string()))?;
        let spec = capability.spec();

        spec.validate(&params)
            .map_err(|reason| WorkflowError::InvalidParams {
                action: action.to_string(),
                reason,
            })?;

        let logged_params = Value::Object(params.clone());

        let positional = match spec.variadic {
            Some(list) => match params.remove(list) {
                Some(Value::Array(items)) => items,
                Some(Value::String(single)) => vec![Value::String(single)],
                Some(other) => {
                    return Err(WorkflowError::InvalidParams {
                        action: action.to_string(),
                        reason: format!("'{}' must be a list, got {}", list, other),
                    })
                }
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let log = if spec.accepts_log {
            log.clone()
        } else {
            AuditLog::disabled()
        };

        tracing::debug!(
            "[CapabilityRegistry] Dispatching '{}' with {} param(s), {} positional",
            action,
            params.len(),
            positional.len()
        );

        let call = Call {
            params,
            positional,
            log: log.clone(),
        };

        let output = match capability.invoke(call).await {
            Ok(output) => output,
            Err(e) => {
                let message = format!("Error in {}: {}", action, e);
                tracing::debug!("[CapabilityRegistry] {}", message);
                log.log_action(action, &logged_params, AuditStatus::Error, message.as_str())
                    .await;
                ActionOutput::with_status(AuditStatus::Error, message)
            }
        };

        Ok(Dispatch {
            action: action.to_string(),
            failure_signal: spec.failure_signal,
            output,
        })
    }
}
