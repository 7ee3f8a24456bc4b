//! Schema types for the workflow manifest and recorded step files.
//!
//! The manifest maps workflow names to step files:
//!
//! ```json
//! {
//!   "workflows": [
//!     { "name": "send_wechat", "file": "send_wechat.json", "description": "..." }
//!   ]
//! }
//! ```
//!
//! A step file is an ordered array of actions:
//!
//! ```json
//! [
//!   { "action": "smart_click_text", "params": { "target_text": "{{contact}}" } },
//!   { "action": "type_text", "params": { "text": "{{message}}" } },
//!   { "action": "press_hotkey", "params": { "keys": ["enter"] } }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step: a capability name and its (possibly templated) arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub action: String,

    #[serde(default)]
    pub params: Map<String, Value>,
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<ActionStep>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<ActionStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Parse a JSON step array.
    pub fn from_json(name: &str, json: &str) -> Result<Self, String> {
        let steps = serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse workflow JSON: {}", e))?;
        Ok(Self::new(name, steps))
    }

    /// Parse a YAML step sequence.
    pub fn from_yaml(name: &str, yaml: &str) -> Result<Self, String> {
        let steps = serde_yaml::from_str(yaml)
            .map_err(|e| format!("Failed to parse workflow YAML: {}", e))?;
        Ok(Self::new(name, steps))
    }
}

/// Manifest entry; keys other than `name` and `file` are kept as metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,

    /// Step file, relative to the workflows directory
    pub file: String,

    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ManifestEntry {
    pub fn description(&self) -> Option<&str> {
        self.metadata.get("description").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub workflows: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse manifest: {}", e))
    }

    pub fn find(&self, name: &str) -> Option<&ManifestEntry> {
        self.workflows.iter().find(|w| w.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step_file() {
        let json = r#"[
            {"action": "start_task_log"},
            {"action": "type_text", "params": {"text": "{{msg}}", "interval": 0.05}},
            {"action": "press_hotkey", "params": {"keys": ["ctrl", "enter"]}}
        ]"#;
        let wf = Workflow::from_json("greet", json).unwrap();
        assert_eq!(wf.steps.len(), 3);
        assert!(wf.steps[0].params.is_empty());
        assert_eq!(wf.steps[1].params["text"], "{{msg}}");
        assert_eq!(wf.steps[2].action, "press_hotkey");
    }

    #[test]
    fn test_parse_yaml_steps() {
        let yaml = r#"
- action: wait
  params:
    seconds: 1
- action: smart_click_text
  params:
    target_text: "{{contact}}"
"#;
        let wf = Workflow::from_yaml("chat", yaml).unwrap();
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[1].params["target_text"], "{{contact}}");
    }

    #[test]
    fn test_step_without_action_is_rejected() {
        assert!(Workflow::from_json("bad", r#"[{"params": {}}]"#).is_err());
        assert!(Workflow::from_json("bad", r#"{"action": "wait"}"#).is_err());
    }

    #[test]
    fn test_manifest_keeps_metadata() {
        let manifest = Manifest::from_json(
            r#"{"workflows": [
                {"name": "greet", "file": "greet.json", "description": "Say hi", "recorded_at": "2024-05-01"}
            ]}"#,
        )
        .unwrap();
        let entry = manifest.find("greet").unwrap();
        assert_eq!(entry.file, "greet.json");
        assert_eq!(entry.description(), Some("Say hi"));
        assert_eq!(entry.metadata["recorded_at"], "2024-05-01");
        assert!(manifest.find("missing").is_none());
    }
}
