//! Built-in desktop capabilities.
//!
//! Each capability validates its arguments, calls the [`DesktopDriver`],
//! and writes its own audit entry. Text lookups made while retrying or
//! polling log one `find_text_on_screen` entry per attempt, followed by a
//! summary entry under the wrapping capability's name.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use chrono::Local;
use serde_json::{json, Value};

use super::{
    ActionOutput, Call, Capability, CapabilityRegistry, CapabilitySpec, DesktopDriver,
    MouseButton, Region, TextMatch,
};
use crate::audit::{self, AuditLog, AuditStatus};
use crate::config::EngineConfig;
use crate::error::CapabilityError;
use crate::workflow::retry::{
    non_negative_secs, poll_until, retry_bounded, PollOutcome, PollPolicy, RetryOutcome,
    RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF,
};

const FIND_TEXT_ON_SCREEN: &str = "find_text_on_screen";
const WAIT_FOR_TEXT_APPEAR: &str = "wait_for_text_appear";
const MOVE_AND_CLICK: &str = "move_and_click";

/// Template-match threshold for `find_and_click_image`.
const IMAGE_MATCH_CONFIDENCE: f64 = 0.9;

/// Polling interval used by `verify_operation_result`.
const VERIFY_CHECK_INTERVAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    StartTaskLog,
    EndTaskWithVerdict,
    Wait,
    Sleep,
    TakeScreenshot,
    MoveAndClick,
    TypeText,
    PasteText,
    PressHotkey,
    AnalyzeScreenState,
    FindTextOnScreen,
    OcrFromScreenArea,
    SmartClickText,
    WaitForTextAppear,
    VerifyOperationResult,
    FindAndClickImage,
}

const ALL: &[Kind] = &[
    Kind::StartTaskLog,
    Kind::EndTaskWithVerdict,
    Kind::Wait,
    Kind::Sleep,
    Kind::TakeScreenshot,
    Kind::MoveAndClick,
    Kind::TypeText,
    Kind::PasteText,
    Kind::PressHotkey,
    Kind::AnalyzeScreenState,
    Kind::FindTextOnScreen,
    Kind::OcrFromScreenArea,
    Kind::SmartClickText,
    Kind::WaitForTextAppear,
    Kind::VerifyOperationResult,
    Kind::FindAndClickImage,
];

impl Kind {
    fn spec(self) -> CapabilitySpec {
        match self {
            Kind::StartTaskLog => CapabilitySpec::new("start_task_log")
                .describe("Create a new task log and return its path"),
            Kind::EndTaskWithVerdict => CapabilitySpec::new("end_task_with_verdict")
                .describe("Record the operator's verdict for the task")
                .required("status")
                .optional("user_feedback")
                .with_log(),
            Kind::Wait => CapabilitySpec::new("wait")
                .describe("Pause for a number of seconds")
                .required("seconds")
                .with_log(),
            Kind::Sleep => CapabilitySpec::new("sleep")
                .describe("Alias for wait")
                .required("seconds")
                .with_log(),
            Kind::TakeScreenshot => CapabilitySpec::new("take_screenshot")
                .describe("Save a screenshot to a file")
                .optional("file_path")
                .with_log(),
            Kind::MoveAndClick => CapabilitySpec::new(MOVE_AND_CLICK)
                .describe("Move the pointer and click")
                .required("x")
                .required("y")
                .optional("button")
                .with_log(),
            Kind::TypeText => CapabilitySpec::new("type_text")
                .describe("Type text key by key")
                .required("text")
                .optional("interval")
                .with_log(),
            Kind::PasteText => CapabilitySpec::new("paste_text")
                .describe("Paste text through the clipboard")
                .required("text")
                .with_log(),
            Kind::PressHotkey => CapabilitySpec::new("press_hotkey")
                .describe("Press a key combination")
                .variadic("keys")
                .with_log(),
            Kind::AnalyzeScreenState => CapabilitySpec::new("analyze_screen_state")
                .describe("OCR the whole screen")
                .with_log(),
            Kind::FindTextOnScreen => CapabilitySpec::new(FIND_TEXT_ON_SCREEN)
                .describe("Locate text on screen")
                .required("target_text")
                .with_log(),
            Kind::OcrFromScreenArea => CapabilitySpec::new("ocr_from_screen_area")
                .describe("OCR a screen rectangle")
                .required("x1")
                .required("y1")
                .required("x2")
                .required("y2")
                .with_log(),
            Kind::SmartClickText => CapabilitySpec::new("smart_click_text")
                .describe("Find text and click it, retrying while it is not visible")
                .required("target_text")
                .optional("button")
                .optional("max_retries")
                .with_log()
                .signals_failure_in_result(),
            Kind::WaitForTextAppear => CapabilitySpec::new(WAIT_FOR_TEXT_APPEAR)
                .describe("Wait until text becomes visible")
                .required("target_text")
                .optional("timeout")
                .optional("check_interval")
                .with_log(),
            Kind::VerifyOperationResult => CapabilitySpec::new("verify_operation_result")
                .describe("Check that expected text appears after an operation")
                .required("expected_text")
                .optional("timeout")
                .with_log(),
            Kind::FindAndClickImage => CapabilitySpec::new("find_and_click_image")
                .describe("Locate an image template on screen and click it")
                .required("image_description")
                .required("model_analysis_base64")
                .with_log(),
        }
    }
}

/// Shared state of the built-ins.
struct Desktop {
    driver: Arc<dyn DesktopDriver>,
    logs_dir: PathBuf,
}

/// One built-in capability.
pub struct Builtin {
    kind: Kind,
    spec: CapabilitySpec,
    desktop: Arc<Desktop>,
}

/// Register every built-in capability, backed by `driver`.
pub fn register_builtins(
    registry: &mut CapabilityRegistry,
    driver: Arc<dyn DesktopDriver>,
    logs_dir: impl Into<PathBuf>,
) {
    let desktop = Arc::new(Desktop {
        driver,
        logs_dir: logs_dir.into(),
    });
    for &kind in ALL {
        registry.register(Builtin {
            kind,
            spec: kind.spec(),
            desktop: desktop.clone(),
        });
    }
}

impl CapabilityRegistry {
    /// Registry holding all built-ins.
    pub fn with_builtins(driver: Arc<dyn DesktopDriver>, config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry, driver, config.logs_dir.clone());
        registry
    }
}

#[async_trait]
impl Capability for Builtin {
    fn spec(&self) -> &CapabilitySpec {
        &self.spec
    }

    async fn invoke(&self, call: Call) -> Result<ActionOutput, CapabilityError> {
        let d = &self.desktop;
        match self.kind {
            Kind::StartTaskLog => d.start_task_log().await,
            Kind::EndTaskWithVerdict => d.end_task_with_verdict(&call).await,
            Kind::Wait => d.wait(&call, "wait").await,
            Kind::Sleep => d.wait(&call, "sleep").await,
            Kind::TakeScreenshot => d.take_screenshot(&call).await,
            Kind::MoveAndClick => d.move_and_click(&call).await,
            Kind::TypeText => d.type_text(&call).await,
            Kind::PasteText => d.paste_text(&call).await,
            Kind::PressHotkey => d.press_hotkey(&call).await,
            Kind::AnalyzeScreenState => d.analyze_screen_state(&call).await,
            Kind::FindTextOnScreen => d.find_text_on_screen(&call).await,
            Kind::OcrFromScreenArea => d.ocr_from_screen_area(&call).await,
            Kind::SmartClickText => d.smart_click_text(&call).await,
            Kind::WaitForTextAppear => d.wait_for_text_appear(&call).await,
            Kind::VerifyOperationResult => d.verify_operation_result(&call).await,
            Kind::FindAndClickImage => d.find_and_click_image(&call).await,
        }
    }
}

/// Log `output` under `action` and hand it back.
async fn finish(
    log: &AuditLog,
    action: &str,
    params: &Value,
    output: ActionOutput,
) -> Result<ActionOutput, CapabilityError> {
    log.log_action(action, params, output.status, output.message.as_str())
        .await;
    Ok(output)
}

impl Desktop {
    async fn start_task_log(&self) -> Result<ActionOutput, CapabilityError> {
        let path = audit::start_task_log(&self.logs_dir).await?;
        let shown = path.display().to_string();
        tracing::info!("[Builtin] Task log started at {}", shown);
        Ok(
            ActionOutput::success(format!("Task started. Logging to: {}", shown))
                .with_payload(json!(shown)),
        )
    }

    async fn end_task_with_verdict(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let status = call.string("status")?;
        let verdict = match status.as_str() {
            "success" => AuditStatus::Success,
            "failure" => AuditStatus::Failed,
            other => {
                return Err(CapabilityError::InvalidArgument(format!(
                    "verdict must be 'success' or 'failure', got '{}'",
                    other
                )))
            }
        };
        let feedback = call.string_or("user_feedback", "")?;

        let params = json!({ "status": status, "user_feedback": feedback });
        call.log
            .log_action(
                "task_verdict",
                &params,
                verdict,
                format!("Task ended with status: {}", status),
            )
            .await;

        let destination = call
            .log
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<no task log>".to_string());
        Ok(ActionOutput::success(format!(
            "Task ended. Verdict '{}' recorded in {}",
            status, destination
        )))
    }

    async fn wait(&self, call: &Call, action: &str) -> Result<ActionOutput, CapabilityError> {
        let seconds = call.f64_or("seconds", 0.0)?;
        tokio::time::sleep(non_negative_secs("seconds", seconds)?).await;
        finish(
            &call.log,
            action,
            &json!({ "seconds": seconds }),
            ActionOutput::success(format!("Waited for {} seconds.", seconds)),
        )
        .await
    }

    async fn take_screenshot(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let file_path = call.string_or("file_path", "screenshot.png")?;
        let path = PathBuf::from(&file_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.driver.save_screenshot(&path)?;
        finish(
            &call.log,
            "take_screenshot",
            &json!({ "file_path": file_path }),
            ActionOutput::success(format!("Screenshot saved to {}", file_path))
                .with_payload(json!(file_path)),
        )
        .await
    }

    /// Click and log a `move_and_click` entry either way.
    async fn click_logged(
        &self,
        log: &AuditLog,
        x: i64,
        y: i64,
        button: MouseButton,
    ) -> Result<String, CapabilityError> {
        let params = json!({ "x": x, "y": y, "button": button.as_str() });
        match self.driver.click(x, y, button) {
            Ok(()) => {
                let message = format!("Clicked {} button at ({}, {})", button, x, y);
                log.log_action(MOVE_AND_CLICK, &params, AuditStatus::Success, message.as_str())
                    .await;
                Ok(message)
            }
            Err(e) => {
                log.log_action(
                    MOVE_AND_CLICK,
                    &params,
                    AuditStatus::Error,
                    format!("Error moving or clicking mouse: {}", e),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn move_and_click(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let (x, y) = (call.i64("x")?, call.i64("y")?);
        let button: MouseButton = call.string_or("button", "left")?.parse()?;
        Ok(match self.click_logged(&call.log, x, y, button).await {
            Ok(message) => ActionOutput::success(message),
            Err(e) => ActionOutput::with_status(
                AuditStatus::Error,
                format!("Error moving or clicking mouse: {}", e),
            ),
        })
    }

    async fn type_text(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let text = call.string("text")?;
        let interval = call.f64_or("interval", 0.1)?;
        self.driver
            .type_text(&text, non_negative_secs("interval", interval)?)?;
        finish(
            &call.log,
            "type_text",
            &json!({ "text": text, "interval": interval }),
            ActionOutput::success(format!("Typed text: {}", text)),
        )
        .await
    }

    async fn paste_text(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let text = call.string("text")?;
        self.driver.paste_text(&text)?;
        finish(
            &call.log,
            "paste_text",
            &json!({ "text": text }),
            ActionOutput::success(format!("Pasted text: {}", text)),
        )
        .await
    }

    async fn press_hotkey(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let keys = call.positional_strings()?;
        if keys.is_empty() {
            return Err(CapabilityError::InvalidArgument(
                "press_hotkey needs at least one key".to_string(),
            ));
        }
        self.driver.press_hotkey(&keys)?;
        finish(
            &call.log,
            "press_hotkey",
            &json!({ "keys": keys }),
            ActionOutput::success(format!("Pressed hotkey: {}", keys.join("+"))),
        )
        .await
    }

    async fn analyze_screen_state(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let screen = self.driver.read_screen()?;
        let lines: Vec<&str> = screen
            .text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let payload = json!({
            "screen_size": { "width": screen.width, "height": screen.height },
            "detected_text": screen.text.trim(),
            "text_lines": lines,
            "timestamp": Local::now().to_rfc3339(),
        });
        finish(
            &call.log,
            "analyze_screen_state",
            &json!({}),
            ActionOutput::success(format!("Screen analyzed: {} text lines detected", lines.len()))
                .with_payload(payload),
        )
        .await
    }

    /// One OCR lookup, logged as a `find_text_on_screen` entry.
    async fn locate_text(
        &self,
        log: &AuditLog,
        target: &str,
    ) -> Result<Option<TextMatch>, CapabilityError> {
        let params = json!({ "target_text": target });
        match self.driver.find_text(target) {
            Ok(Some(found)) => {
                log.log_action(
                    FIND_TEXT_ON_SCREEN,
                    &params,
                    AuditStatus::Success,
                    format!("Found '{}' at ({}, {})", target, found.x, found.y),
                )
                .await;
                Ok(Some(found))
            }
            Ok(None) => {
                log.log_action(
                    FIND_TEXT_ON_SCREEN,
                    &params,
                    AuditStatus::NotFound,
                    format!("Text '{}' not found on screen", target),
                )
                .await;
                Ok(None)
            }
            Err(e) => {
                log.log_action(
                    FIND_TEXT_ON_SCREEN,
                    &params,
                    AuditStatus::Error,
                    format!("Error searching for text: {}", e),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn find_text_on_screen(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let target = call.string("target_text")?;
        Ok(match self.locate_text(&call.log, &target).await {
            Ok(Some(found)) => {
                ActionOutput::success(format!("Found '{}' at ({}, {})", target, found.x, found.y))
                    .with_payload(json!({
                        "x": found.x,
                        "y": found.y,
                        "confidence": found.confidence,
                    }))
            }
            Ok(None) => ActionOutput::with_status(
                AuditStatus::NotFound,
                format!("Text '{}' not found on screen", target),
            ),
            Err(e) => ActionOutput::with_status(
                AuditStatus::Error,
                format!("Error searching for text: {}", e),
            ),
        })
    }

    async fn ocr_from_screen_area(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let (x1, y1) = (call.i64("x1")?, call.i64("y1")?);
        let (x2, y2) = (call.i64("x2")?, call.i64("y2")?);
        let text = self
            .driver
            .read_region(Region::from_corners(x1, y1, x2, y2)?)?;
        let text = text.trim();
        finish(
            &call.log,
            "ocr_from_screen_area",
            &json!({ "x1": x1, "y1": y1, "x2": x2, "y2": y2 }),
            ActionOutput::success(text).with_payload(json!(text)),
        )
        .await
    }

    async fn smart_click_text(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let target = call.string("target_text")?;
        let button: MouseButton = call.string_or("button", "left")?.parse()?;
        let max_retries = call.u32_or("max_retries", DEFAULT_MAX_RETRIES)?;
        let policy = RetryPolicy::new(max_retries, DEFAULT_RETRY_BACKOFF)?;

        let log = &call.log;
        let wanted = target.as_str();
        let outcome = retry_bounded(&policy, move |_| async move {
            match self.locate_text(log, wanted).await? {
                Some(found) => {
                    self.driver.click(found.x, found.y, button)?;
                    Ok(Some(found))
                }
                None => Ok(None),
            }
        })
        .await;

        let output = match outcome {
            RetryOutcome::Succeeded { value, attempts } => ActionOutput::success(format!(
                "Successfully clicked '{}' at ({}, {}) on attempt {}",
                target, value.x, value.y, attempts
            ))
            .with_payload(json!({ "x": value.x, "y": value.y, "attempts": attempts })),
            RetryOutcome::Exhausted {
                attempts,
                last_error: None,
            } => ActionOutput::with_status(
                AuditStatus::NotFound,
                format!("Failed to find text '{}' after {} attempts", target, attempts),
            ),
            RetryOutcome::Exhausted {
                last_error: Some(e),
                ..
            } => ActionOutput::with_status(
                AuditStatus::Error,
                format!("Error clicking text '{}': {}", target, e),
            ),
        };

        finish(
            log,
            "smart_click_text",
            &json!({ "target_text": target, "button": button.as_str(), "max_retries": max_retries }),
            output,
        )
        .await
    }

    /// Poll for `target`, logging lookups and a `wait_for_text_appear` summary.
    async fn wait_for_text(
        &self,
        log: &AuditLog,
        target: &str,
        timeout: f64,
        check_interval: f64,
    ) -> Result<ActionOutput, CapabilityError> {
        let policy = PollPolicy::from_secs_f64(timeout, check_interval)?;
        let outcome = poll_until(&policy, move || async move {
            self.locate_text(log, target).await.ok().flatten()
        })
        .await;

        let output = match outcome {
            PollOutcome::Ready { elapsed, checks, .. } => ActionOutput::success(format!(
                "Text '{}' appeared after {:.1} seconds",
                target,
                elapsed.as_secs_f64()
            ))
            .with_payload(json!({ "elapsed_secs": elapsed.as_secs_f64(), "checks": checks })),
            PollOutcome::TimedOut { checks, .. } => ActionOutput::with_status(
                AuditStatus::Timeout,
                format!("Text '{}' did not appear within {} seconds", target, timeout),
            )
            .with_payload(json!({ "checks": checks })),
        };

        finish(
            log,
            WAIT_FOR_TEXT_APPEAR,
            &json!({ "target_text": target, "timeout": timeout, "check_interval": check_interval }),
            output,
        )
        .await
    }

    async fn wait_for_text_appear(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let target = call.string("target_text")?;
        let timeout = call.f64_or("timeout", 10.0)?;
        let check_interval = call.f64_or("check_interval", 1.0)?;
        self.wait_for_text(&call.log, &target, timeout, check_interval)
            .await
    }

    async fn verify_operation_result(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let expected = call.string("expected_text")?;
        let timeout = call.f64_or("timeout", 5.0)?;
        let waited = self
            .wait_for_text(&call.log, &expected, timeout, VERIFY_CHECK_INTERVAL)
            .await?;

        let output = if waited.is_success() {
            ActionOutput::success(format!("Operation verified: '{}' found on screen", expected))
        } else {
            ActionOutput::with_status(
                AuditStatus::Failed,
                format!(
                    "Operation verification failed: '{}' not found within {} seconds",
                    expected, timeout
                ),
            )
        };

        finish(
            &call.log,
            "verify_operation_result",
            &json!({ "expected_text": expected, "timeout": timeout }),
            output,
        )
        .await
    }

    async fn click_image(&self, call: &Call, description: &str) -> Result<(i64, i64), CapabilityError> {
        let encoded = call.string("model_analysis_base64")?;
        let template = BASE64_STANDARD.decode(encoded.trim()).map_err(|e| {
            CapabilityError::InvalidArgument(format!("image template is not valid base64: {}", e))
        })?;
        let (x, y) = self
            .driver
            .locate_image(&template, IMAGE_MATCH_CONFIDENCE)?
            .ok_or_else(|| {
                CapabilityError::Driver(format!(
                    "Could not find the image for '{}' on the screen.",
                    description
                ))
            })?;
        self.click_logged(&call.log, x, y, MouseButton::Left).await?;
        Ok((x, y))
    }

    async fn find_and_click_image(&self, call: &Call) -> Result<ActionOutput, CapabilityError> {
        let description = call.string("image_description")?;
        let output = match self.click_image(call, &description).await {
            Ok((x, y)) => ActionOutput::success(format!(
                "Successfully found and clicked '{}' at ({}, {}).",
                description, x, y
            ))
            .with_payload(json!({ "x": x, "y": y })),
            Err(e) => ActionOutput::with_status(
                AuditStatus::Error,
                format!("Error in find_and_click_image: {}", e),
            ),
        };
        // The template itself is left out of the log.
        finish(
            &call.log,
            "find_and_click_image",
            &json!({ "image_description": description }),
            output,
        )
        .await
    }
}
