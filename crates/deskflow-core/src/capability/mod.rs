//! Capabilities: named desktop-interaction primitives invocable by name.
//!
//! ```text
//! action name ──► CapabilityRegistry ──► Arc<dyn Capability> ──► DesktopDriver
//!                      │                        │
//!                 CapabilitySpec            AuditLog (if accepts_log)
//! ```
//!
//! Every capability declares a [`CapabilitySpec`] at registration: its
//! parameter shape, whether it wants the run's log destination, which list
//! parameter (if any) is unpacked into positional arguments, and whether its
//! result text signals step failure.

pub mod builtin;
pub mod driver;
pub mod registry;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::audit::{AuditLog, AuditStatus};
use crate::error::CapabilityError;

pub use builtin::register_builtins;
pub use driver::{DesktopDriver, HeadlessDriver, MouseButton, Region, ScreenText, TextMatch};
pub use registry::{CapabilityRegistry, Dispatch};

/// How a capability's result is interpreted by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureSignal {
    /// The result is reported, never classified.
    #[default]
    None,
    /// Failure markers in the result text mark the step as failed.
    ResultText,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
}

/// Declared calling convention of a capability.
#[derive(Debug, Clone)]
pub struct CapabilitySpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    /// Receive the run's log destination
    pub accepts_log: bool,
    /// List parameter passed as positional arguments
    pub variadic: Option<&'static str>,
    pub failure_signal: FailureSignal,
}

impl CapabilitySpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            params: Vec::new(),
            accepts_log: false,
            variadic: None,
            failure_signal: FailureSignal::None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn required(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec { name, required: true });
        self
    }

    pub fn optional(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec { name, required: false });
        self
    }

    /// Unpack the named list parameter into positional arguments.
    pub fn variadic(mut self, name: &'static str) -> Self {
        self.variadic = Some(name);
        self
    }

    pub fn with_log(mut self) -> Self {
        self.accepts_log = true;
        self
    }

    pub fn signals_failure_in_result(mut self) -> Self {
        self.failure_signal = FailureSignal::ResultText;
        self
    }

    /// Check a parameter map against the declared shape.
    pub fn validate(&self, params: &Map<String, Value>) -> Result<(), String> {
        for key in params.keys() {
            let declared = self.params.iter().any(|p| p.name == key)
                || self.variadic == Some(key.as_str());
            if !declared {
                return Err(format!("unexpected parameter '{}'", key));
            }
        }
        for param in self.params.iter().filter(|p| p.required) {
            if !params.contains_key(param.name) {
                return Err(format!("missing required parameter '{}'", param.name));
            }
        }
        if let Some(list) = self.variadic {
            if !params.contains_key(list) {
                return Err(format!("missing required parameter '{}'", list));
            }
        }
        Ok(())
    }
}

/// What a capability returns for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    pub status: AuditStatus,
    /// Human-readable result, printed and classified
    pub message: String,
    /// Structured result (coordinates, screen analysis, file paths)
    pub payload: Option<Value>,
}

impl ActionOutput {
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(AuditStatus::Success, message)
    }

    pub fn with_status(status: AuditStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == AuditStatus::Success
    }
}

/// Arguments assembled by the dispatcher for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub params: Map<String, Value>,
    /// Items of the variadic list parameter
    pub positional: Vec<Value>,
    pub log: AuditLog,
}

impl Call {
    pub fn new(params: Map<String, Value>) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Required string argument; scalars are accepted in their string form.
    pub fn string(&self, name: &str) -> Result<String, CapabilityError> {
        match self.params.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            Some(other) => Err(CapabilityError::InvalidArgument(format!(
                "'{}' must be a string, got {}",
                name, other
            ))),
            None => Err(CapabilityError::InvalidArgument(format!(
                "missing argument '{}'",
                name
            ))),
        }
    }

    pub fn string_or(&self, name: &str, default: &str) -> Result<String, CapabilityError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default.to_string()),
            Some(_) => self.string(name),
        }
    }

    /// Numeric argument; numeric strings (from substituted placeholders) are parsed.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, CapabilityError> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => as_f64(name, v),
        }
    }

    pub fn i64(&self, name: &str) -> Result<i64, CapabilityError> {
        let value = self.params.get(name).ok_or_else(|| {
            CapabilityError::InvalidArgument(format!("missing argument '{}'", name))
        })?;
        let n = as_f64(name, value)?;
        if n.fract() != 0.0 {
            return Err(CapabilityError::InvalidArgument(format!(
                "'{}' must be an integer, got {}",
                name, value
            )));
        }
        Ok(n as i64)
    }

    pub fn u32_or(&self, name: &str, default: u32) -> Result<u32, CapabilityError> {
        if matches!(self.params.get(name), None | Some(Value::Null)) {
            return Ok(default);
        }
        let n = self.i64(name)?;
        u32::try_from(n).map_err(|_| {
            CapabilityError::InvalidArgument(format!("'{}' must be non-negative, got {}", name, n))
        })
    }

    /// Positional arguments as strings.
    pub fn positional_strings(&self) -> Result<Vec<String>, CapabilityError> {
        self.positional
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                Value::Number(_) | Value::Bool(_) => Ok(v.to_string()),
                other => Err(CapabilityError::InvalidArgument(format!(
                    "positional argument must be a string, got {}",
                    other
                ))),
            })
            .collect()
    }
}

fn as_f64(name: &str, value: &Value) -> Result<f64, CapabilityError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        CapabilityError::InvalidArgument(format!("'{}' must be a number, got {}", name, value))
    })
}

/// A named, registered interaction primitive.
#[async_trait]
pub trait Capability: Send + Sync {
    fn spec(&self) -> &CapabilitySpec;

    async fn invoke(&self, call: Call) -> Result<ActionOutput, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_rejects_unknown_and_missing() {
        let spec = CapabilitySpec::new("type_text")
            .required("text")
            .optional("interval");

        assert!(spec.validate(&params(json!({ "text": "hi" }))).is_ok());
        assert_eq!(
            spec.validate(&params(json!({ "interval": 0.1 }))),
            Err("missing required parameter 'text'".to_string())
        );
        assert_eq!(
            spec.validate(&params(json!({ "text": "hi", "speed": 2 }))),
            Err("unexpected parameter 'speed'".to_string())
        );
    }

    #[test]
    fn test_variadic_param_is_declared_and_required() {
        let spec = CapabilitySpec::new("press_hotkey").variadic("keys");
        assert!(spec.validate(&params(json!({ "keys": ["ctrl", "v"] }))).is_ok());
        assert!(spec.validate(&params(json!({}))).is_err());
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let call = Call::new(params(json!({
            "max_retries": "5",
            "timeout": 2.5,
            "x": "100",
            "bad": "abc"
        })));
        assert_eq!(call.u32_or("max_retries", 3).unwrap(), 5);
        assert_eq!(call.u32_or("absent", 3).unwrap(), 3);
        assert_eq!(call.f64_or("timeout", 10.0).unwrap(), 2.5);
        assert_eq!(call.i64("x").unwrap(), 100);
        assert!(call.f64_or("bad", 1.0).is_err());
    }

    #[test]
    fn test_string_accepts_scalars() {
        let call = Call::new(params(json!({ "text": 42, "nested": { "a": 1 } })));
        assert_eq!(call.string("text").unwrap(), "42");
        assert!(call.string("nested").is_err());
        assert_eq!(call.string_or("button", "left").unwrap(), "left");
    }
}
