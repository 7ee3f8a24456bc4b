//! Run-wide parameter set and `{{name}}` placeholder substitution.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::WorkflowError;

/// Flat `name → value` map supplied once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: BTreeMap<String, String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object; scalars are kept in their string form.
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| WorkflowError::InvalidParameterSet(e.to_string()))?;
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(WorkflowError::InvalidParameterSet(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self, WorkflowError> {
        let mut values = BTreeMap::new();
        for (name, value) in map {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(WorkflowError::InvalidParameterSet(format!(
                        "'{}' must be a scalar value",
                        name
                    )))
                }
            };
            values.insert(name, text);
        }
        Ok(Self { values })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Name inside a full-string `{{name}}` placeholder.
pub fn placeholder_name(s: &str) -> Option<&str> {
    let name = s.strip_prefix("{{")?.strip_suffix("}}")?;
    // Names containing braces are never placeholders.
    if name.is_empty() || name.contains(['{', '}']) {
        return None;
    }
    Some(name)
}

/// Return a copy of `params` with every known placeholder replaced.
///
/// Only values that are exactly a placeholder are replaced; unknown names
/// and embedded placeholders (`"Hi {{name}}"`) are left as they are.
pub fn substitute(params: &Map<String, Value>, set: &ParameterSet) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), substitute_value(value, set)))
        .collect()
}

fn substitute_value(value: &Value, set: &ParameterSet) -> Value {
    match value {
        Value::String(s) => match placeholder_name(s).and_then(|name| set.get(name)) {
            Some(replacement) => Value::String(replacement.to_string()),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_value(v, set)).collect()),
        Value::Object(map) => Value::Object(substitute(map, set)),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_placeholder_name() {
        assert_eq!(placeholder_name("{{msg}}"), Some("msg"));
        assert_eq!(placeholder_name("{{}}"), None);
        assert_eq!(placeholder_name("{{a}b}}"), None);
        assert_eq!(placeholder_name("hi {{msg}}"), None);
        assert_eq!(placeholder_name("{msg}"), None);
    }

    #[test]
    fn test_substitute_full_matches_only() {
        let set = ParameterSet::from_json(r#"{"msg": "hello", "n": 3}"#).unwrap();
        let out = substitute(
            &obj(json!({
                "text": "{{msg}}",
                "greeting": "say {{msg}}",
                "count": "{{n}}",
                "interval": 0.1
            })),
            &set,
        );
        assert_eq!(out["text"], "hello");
        assert_eq!(out["greeting"], "say {{msg}}");
        assert_eq!(out["count"], "3");
        assert_eq!(out["interval"], 0.1);
    }

    #[test]
    fn test_unknown_placeholder_passes_through() {
        let out = substitute(&obj(json!({ "text": "{{x}}" })), &ParameterSet::new());
        assert_eq!(out["text"], "{{x}}");
    }

    #[test]
    fn test_substitute_descends_into_lists() {
        let mut set = ParameterSet::new();
        set.insert("modifier", "ctrl");
        let out = substitute(&obj(json!({ "keys": ["{{modifier}}", "v"] })), &set);
        assert_eq!(out["keys"], json!(["ctrl", "v"]));
    }

    #[test]
    fn test_substitute_is_idempotent() {
        let set = ParameterSet::from_json(r#"{"contact": "Alice", "msg": "see you"}"#).unwrap();
        let params = obj(json!({ "target_text": "{{contact}}", "text": "{{msg}}", "other": "{{missing}}" }));
        let once = substitute(&params, &set);
        let twice = substitute(&once, &set);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_substitute_does_not_rescan_replacements() {
        let set = ParameterSet::from_json(r#"{"a": "{{b}}", "b": "boom"}"#).unwrap();
        let out = substitute(&obj(json!({ "text": "{{a}}" })), &set);
        assert_eq!(out["text"], "{{b}}");
    }

    #[test]
    fn test_parameter_set_rejects_nested_values() {
        assert!(matches!(
            ParameterSet::from_json(r#"{"a": {"b": 1}}"#),
            Err(WorkflowError::InvalidParameterSet(_))
        ));
        assert!(ParameterSet::from_json("[1, 2]").is_err());
        assert!(ParameterSet::from_json("not json").is_err());
    }
}
