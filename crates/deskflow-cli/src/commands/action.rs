//! Single-action mode: `deskflow <action> [flags]`.

use clap::Subcommand;
use serde_json::{json, Map, Value};

use deskflow_core::WorkflowExecutor;

use super::{print_json, truncate, Engine};

/// One built-in capability invoked directly from the command line.
#[derive(Debug, Clone, Subcommand)]
pub enum ActionCommand {
    /// Create a new task log and print its path
    StartTaskLog,

    /// Record the verdict for the current task
    EndTaskWithVerdict {
        /// success | failure
        #[arg(long)]
        status: String,
        #[arg(long, default_value = "")]
        user_feedback: String,
    },

    /// Pause for a number of seconds
    Wait {
        #[arg(long)]
        seconds: f64,
    },

    /// Alias for wait
    Sleep {
        #[arg(long)]
        seconds: f64,
    },

    /// Save a screenshot
    TakeScreenshot {
        #[arg(long)]
        file_path: Option<String>,
    },

    /// Move the pointer to (x, y) and click
    MoveAndClick {
        #[arg(long, allow_hyphen_values = true)]
        x: i64,
        #[arg(long, allow_hyphen_values = true)]
        y: i64,
        /// left | right | middle
        #[arg(long)]
        button: Option<String>,
    },

    /// Type text key by key
    TypeText {
        #[arg(long)]
        text: String,
        /// Seconds between keystrokes
        #[arg(long)]
        interval: Option<f64>,
    },

    /// Paste text through the clipboard
    PasteText {
        #[arg(long)]
        text: String,
    },

    /// Press a key combination, e.g. `press-hotkey ctrl v`
    PressHotkey {
        #[arg(required = true, num_args = 1..)]
        keys: Vec<String>,
    },

    /// OCR the whole screen and print what was recognised
    AnalyzeScreenState,

    /// Locate text on screen
    FindTextOnScreen {
        #[arg(long)]
        target_text: String,
    },

    /// OCR the rectangle (x1, y1)-(x2, y2)
    OcrFromScreenArea {
        #[arg(long)]
        x1: i64,
        #[arg(long)]
        y1: i64,
        #[arg(long)]
        x2: i64,
        #[arg(long)]
        y2: i64,
    },

    /// Find text and click it, retrying while it is not visible
    SmartClickText {
        #[arg(long)]
        target_text: String,
        #[arg(long)]
        button: Option<String>,
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Wait until text appears on screen
    WaitForTextAppear {
        #[arg(long)]
        target_text: String,
        #[arg(long)]
        timeout: Option<f64>,
        #[arg(long)]
        check_interval: Option<f64>,
    },

    /// Check that expected text appears after an operation
    VerifyOperationResult {
        #[arg(long)]
        expected_text: String,
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// Locate an image template on screen and click it
    FindAndClickImage {
        #[arg(long)]
        image_description: String,
        /// PNG template, base64-encoded
        #[arg(long)]
        model_analysis_base64: String,
    },
}

impl ActionCommand {
    /// Capability name and arguments; unset options are left to the capability defaults.
    pub fn into_call(self) -> (&'static str, Map<String, Value>) {
        let mut params = Map::new();
        let mut set = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                params.insert(key.to_string(), value);
            }
        };

        let action = match self {
            ActionCommand::StartTaskLog => "start_task_log",
            ActionCommand::EndTaskWithVerdict {
                status,
                user_feedback,
            } => {
                set("status", Some(json!(status)));
                set("user_feedback", Some(json!(user_feedback)));
                "end_task_with_verdict"
            }
            ActionCommand::Wait { seconds } => {
                set("seconds", Some(json!(seconds)));
                "wait"
            }
            ActionCommand::Sleep { seconds } => {
                set("seconds", Some(json!(seconds)));
                "sleep"
            }
            ActionCommand::TakeScreenshot { file_path } => {
                set("file_path", file_path.map(Value::from));
                "take_screenshot"
            }
            ActionCommand::MoveAndClick { x, y, button } => {
                set("x", Some(json!(x)));
                set("y", Some(json!(y)));
                set("button", button.map(Value::from));
                "move_and_click"
            }
            ActionCommand::TypeText { text, interval } => {
                set("text", Some(json!(text)));
                set("interval", interval.map(Value::from));
                "type_text"
            }
            ActionCommand::PasteText { text } => {
                set("text", Some(json!(text)));
                "paste_text"
            }
            ActionCommand::PressHotkey { keys } => {
                set("keys", Some(json!(keys)));
                "press_hotkey"
            }
            ActionCommand::AnalyzeScreenState => "analyze_screen_state",
            ActionCommand::FindTextOnScreen { target_text } => {
                set("target_text", Some(json!(target_text)));
                "find_text_on_screen"
            }
            ActionCommand::OcrFromScreenArea { x1, y1, x2, y2 } => {
                set("x1", Some(json!(x1)));
                set("y1", Some(json!(y1)));
                set("x2", Some(json!(x2)));
                set("y2", Some(json!(y2)));
                "ocr_from_screen_area"
            }
            ActionCommand::SmartClickText {
                target_text,
                button,
                max_retries,
            } => {
                set("target_text", Some(json!(target_text)));
                set("button", button.map(Value::from));
                set("max_retries", max_retries.map(Value::from));
                "smart_click_text"
            }
            ActionCommand::WaitForTextAppear {
                target_text,
                timeout,
                check_interval,
            } => {
                set("target_text", Some(json!(target_text)));
                set("timeout", timeout.map(Value::from));
                set("check_interval", check_interval.map(Value::from));
                "wait_for_text_appear"
            }
            ActionCommand::VerifyOperationResult {
                expected_text,
                timeout,
            } => {
                set("expected_text", Some(json!(expected_text)));
                set("timeout", timeout.map(Value::from));
                "verify_operation_result"
            }
            ActionCommand::FindAndClickImage {
                image_description,
                model_analysis_base64,
            } => {
                set("image_description", Some(json!(image_description)));
                set("model_analysis_base64", Some(json!(model_analysis_base64)));
                "find_and_click_image"
            }
        };

        (action, params)
    }
}

/// Run one action, classified exactly like a workflow step.
pub async fn run(engine: &Engine, action: &str, params: Map<String, Value>) -> Result<(), String> {
    let mut executor = WorkflowExecutor::new(engine.registry.clone(), engine.log.clone());
    let result = executor
        .execute_action(action, params)
        .await
        .map_err(|e| e.to_string())?;

    println!("{}", result.output.message);
    if let Some(payload @ Value::Object(_)) = &result.output.payload {
        print_json(payload);
    }
    Ok(())
}

/// List every registered capability with its parameters.
pub fn list_capabilities(engine: &Engine) -> Result<(), String> {
    println!("┌──────────────────────────┬──────────────────────────────────────────────┐");
    println!("│ Action                   │ Parameters                                   │");
    println!("├──────────────────────────┼──────────────────────────────────────────────┤");

    for spec in engine.registry.specs() {
        let mut params: Vec<String> = spec
            .params
            .iter()
            .map(|p| {
                if p.required {
                    p.name.to_string()
                } else {
                    format!("[{}]", p.name)
                }
            })
            .collect();
        if let Some(list) = spec.variadic {
            params.push(format!("{}...", list));
        }
        println!(
            "│ {:<24} │ {:<44} │",
            truncate(spec.name, 24),
            truncate(&params.join(", "), 44)
        );
    }

    println!("└──────────────────────────┴──────────────────────────────────────────────┘");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_options_are_omitted() {
        let (action, params) = ActionCommand::SmartClickText {
            target_text: "Send".to_string(),
            button: None,
            max_retries: Some(5),
        }
        .into_call();

        assert_eq!(action, "smart_click_text");
        assert_eq!(params.len(), 2);
        assert_eq!(params["max_retries"], 5);
        assert!(!params.contains_key("button"));
    }

    #[test]
    fn test_hotkey_keys_become_list() {
        let (action, params) = ActionCommand::PressHotkey {
            keys: vec!["ctrl".to_string(), "v".to_string()],
        }
        .into_call();
        assert_eq!(action, "press_hotkey");
        assert_eq!(params["keys"], json!(["ctrl", "v"]));
    }
}
