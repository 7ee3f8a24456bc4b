//! Integration tests for the deskflow CLI commands.
//!
//! The commands run against a recording desktop driver and temporary
//! manifest, workflow and log files.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deskflow_cli::commands::{self, action::ActionCommand, Engine};
use deskflow_core::audit::read_entries;
use deskflow_core::capability::{MouseButton, Region, ScreenText, TextMatch};
use deskflow_core::{AuditStatus, CapabilityError, DesktopDriver, EngineConfig};

/// Records typed text; OCR never finds anything.
#[derive(Default)]
struct RecordingDriver {
    typed: Mutex<Vec<String>>,
}

impl DesktopDriver for RecordingDriver {
    fn save_screenshot(&self, _path: &Path) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn read_screen(&self) -> Result<ScreenText, CapabilityError> {
        Ok(ScreenText {
            width: 800,
            height: 600,
            text: String::new(),
        })
    }

    fn find_text(&self, _target: &str) -> Result<Option<TextMatch>, CapabilityError> {
        Ok(None)
    }

    fn read_region(&self, _region: Region) -> Result<String, CapabilityError> {
        Ok(String::new())
    }

    fn click(&self, _x: i64, _y: i64, _button: MouseButton) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn type_text(&self, text: &str, _interval: Duration) -> Result<(), CapabilityError> {
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn paste_text(&self, text: &str) -> Result<(), CapabilityError> {
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn press_hotkey(&self, _keys: &[String]) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn locate_image(
        &self,
        _template_png: &[u8],
        _confidence: f64,
    ) -> Result<Option<(i64, i64)>, CapabilityError> {
        Ok(None)
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    engine: Engine,
    driver: Arc<RecordingDriver>,
    log_path: PathBuf,
}

/// Manifest with `greet` (one templated step) and `half_broken`
/// (a good step followed by an unknown action).
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = EngineConfig::rooted_at(dir.path());
    std::fs::create_dir_all(&config.workflows_dir).unwrap();
    std::fs::write(
        &config.manifest_path,
        r#"{"workflows": [
            {"name": "greet", "file": "greet.json", "description": "Type a greeting"},
            {"name": "half_broken", "file": "half_broken.json"}
        ]}"#,
    )
    .unwrap();
    std::fs::write(
        config.workflows_dir.join("greet.json"),
        r#"[{"action": "type_text", "params": {"text": "{{msg}}"}}]"#,
    )
    .unwrap();
    std::fs::write(
        config.workflows_dir.join("half_broken.json"),
        r#"[
            {"action": "type_text", "params": {"text": "first"}},
            {"action": "teleport", "params": {}}
        ]"#,
    )
    .unwrap();

    let log_path = dir.path().join("task.jsonl");
    let driver = Arc::new(RecordingDriver::default());
    let engine = commands::init_engine(config, Some(log_path.clone()), driver.clone());
    Fixture {
        _dir: dir,
        engine,
        driver,
        log_path,
    }
}

#[tokio::test]
async fn test_execute_greet_workflow() {
    let fx = fixture();

    commands::workflow::execute(&fx.engine, "greet", r#"{"msg": "hello"}"#)
        .await
        .expect("greet should succeed");

    assert_eq!(*fx.driver.typed.lock().unwrap(), vec!["hello"]);
    let entries = read_entries(&fx.log_path).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "type_text");
    assert_eq!(entries[0].status, AuditStatus::Success);
}

#[tokio::test]
async fn test_unknown_action_aborts_workflow() {
    let fx = fixture();

    let err = commands::workflow::execute(&fx.engine, "half_broken", "{}")
        .await
        .unwrap_err();

    assert!(err.contains("teleport"));
    assert_eq!(*fx.driver.typed.lock().unwrap(), vec!["first"]);
    let entries = read_entries(&fx.log_path).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_unknown_workflow_and_bad_params() {
    let fx = fixture();

    let err = commands::workflow::execute(&fx.engine, "nope", "{}")
        .await
        .unwrap_err();
    assert!(err.contains("not found in manifest"));

    let err = commands::workflow::execute(&fx.engine, "greet", r#"{"msg": ["a"]}"#)
        .await
        .unwrap_err();
    assert!(err.contains("Invalid parameter set"));
    assert!(fx.driver.typed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_single_action_mode() {
    let fx = fixture();

    let (name, params) = ActionCommand::TypeText {
        text: "direct".to_string(),
        interval: None,
    }
    .into_call();
    commands::action::run(&fx.engine, name, params).await.unwrap();

    assert_eq!(*fx.driver.typed.lock().unwrap(), vec!["direct"]);
    let entries = read_entries(&fx.log_path).await.unwrap();
    assert_eq!(entries[0].parameters["interval"], 0.1);
}

#[tokio::test(start_paused = true)]
async fn test_single_action_classified_failure() {
    let fx = fixture();

    let (name, params) = ActionCommand::SmartClickText {
        target_text: "Send".to_string(),
        button: None,
        max_retries: Some(2),
    }
    .into_call();
    let err = commands::action::run(&fx.engine, name, params)
        .await
        .unwrap_err();
    assert!(err.contains("Failed to find text 'Send' after 2 attempts"));

    let entries = read_entries(&fx.log_path).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].status, AuditStatus::NotFound);
}

#[tokio::test]
async fn test_validate_and_list_workflows() {
    let fx = fixture();

    commands::workflow::list(&fx.engine).unwrap();
    commands::workflow::validate(&fx.engine, "greet").unwrap();
    let err = commands::workflow::validate(&fx.engine, "half_broken").unwrap_err();
    assert!(err.contains("teleport"));
}

#[tokio::test]
async fn test_log_inspection() {
    let fx = fixture();

    commands::workflow::execute(&fx.engine, "greet", r#"{"msg": "hi"}"#)
        .await
        .unwrap();
    commands::log::show(&fx.log_path, false).await.unwrap();
    commands::log::summary(&fx.log_path).await.unwrap();

    let missing = fx.log_path.with_file_name("missing.jsonl");
    assert!(commands::log::summary(&missing).await.is_err());
}
