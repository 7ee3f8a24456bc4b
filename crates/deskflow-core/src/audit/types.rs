//! Audit record types.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Outcome recorded for a single capability invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
    NotFound,
    Timeout,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Error => "error",
            AuditStatus::NotFound => "not_found",
            AuditStatus::Timeout => "timeout",
            AuditStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One line of a task log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 local time; written with an offset, read with or without one
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<FixedOffset>,

    /// Capability name (or `task_verdict`)
    pub action: String,

    /// Parameters actually passed to the capability
    pub parameters: Value,

    pub status: AuditStatus,

    /// Human-readable message or structured payload
    pub result: Value,
}

impl AuditEntry {
    /// Build an entry stamped with the current local time.
    pub fn now(
        action: impl Into<String>,
        parameters: Value,
        status: AuditStatus,
        result: impl Into<Value>,
    ) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            action: action.into(),
            parameters,
            status,
            result: result.into(),
        }
    }
}

/// Parse an RFC 3339 timestamp, or an offset-less one taken as local time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    let naive = s.parse::<NaiveDateTime>().ok()?;
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => Some(local.fixed_offset()),
        None => FixedOffset::east_opt(0).map(|utc| utc.from_utc_datetime(&naive)),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_with_snake_case_status() {
        let entry = AuditEntry::now(
            "find_text_on_screen",
            serde_json::json!({ "target_text": "OK" }),
            AuditStatus::NotFound,
            "Text 'OK' not found on screen",
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["action"], "find_text_on_screen");
        assert_eq!(json["parameters"]["target_text"], "OK");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_timestamp_with_and_without_offset() {
        let with_offset = parse_timestamp("2024-05-01T12:00:00.5+08:00").unwrap();
        assert_eq!(with_offset.offset().local_minus_utc(), 8 * 3600);

        let naive = parse_timestamp("2024-05-01T12:00:00.123456").unwrap();
        assert_eq!(naive.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 12:00:00");

        assert!(parse_timestamp("yesterday").is_none());
    }
}
