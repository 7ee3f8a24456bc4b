//! deskflow CLI: run single desktop actions or recorded workflows.
//!
//! Every command drives the same deskflow-core engine; screen, OCR and
//! input primitives come from the configured desktop driver.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use deskflow_cli::commands::{self, action::ActionCommand};
use deskflow_core::config::{DEFAULT_LOGS_DIR, DEFAULT_MANIFEST_FILE, DEFAULT_WORKFLOWS_DIR};
use deskflow_core::{EngineConfig, HeadlessDriver};

/// deskflow: recorded desktop-automation workflows
#[derive(Parser)]
#[command(name = "deskflow", version, about = "deskflow: recorded desktop-automation workflows")]
pub struct Cli {
    /// JSONL task log to append an entry to for every action
    #[arg(long, global = true)]
    log_file_path: Option<PathBuf>,

    /// Workflow manifest
    #[arg(long, env = "DESKFLOW_MANIFEST", default_value = DEFAULT_MANIFEST_FILE, global = true)]
    manifest: PathBuf,

    /// Directory manifest step files are resolved against
    #[arg(long, env = "DESKFLOW_WORKFLOWS_DIR", default_value = DEFAULT_WORKFLOWS_DIR, global = true)]
    workflows_dir: PathBuf,

    /// Directory new task logs are created in
    #[arg(long, env = "DESKFLOW_LOGS_DIR", default_value = DEFAULT_LOGS_DIR, global = true)]
    logs_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow from the manifest
    ExecuteWorkflow {
        /// Workflow name in the manifest
        #[arg(long)]
        name: String,
        /// Parameters as a JSON object, e.g. '{"contact": "Alice"}'
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Inspect the workflows in the manifest
    Workflows {
        #[command(subcommand)]
        action: WorkflowsAction,
    },

    /// Inspect a task log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// List every available action
    Capabilities,

    #[command(flatten)]
    Action(ActionCommand),
}

#[derive(Subcommand)]
enum WorkflowsAction {
    /// List workflows in the manifest
    List,
    /// Load a workflow and check its steps without executing them
    Validate {
        /// Workflow name in the manifest
        name: String,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Print the entries of a task log
    Show {
        path: PathBuf,
        /// Only entries whose status is not success
        #[arg(long)]
        failures: bool,
    },
    /// Print per-status counts and the recorded verdict
    Summary { path: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deskflow_core=warn,deskflow_cli=info".into()),
        )
        .init();

    let config = EngineConfig {
        manifest_path: cli.manifest,
        workflows_dir: cli.workflows_dir,
        logs_dir: cli.logs_dir,
    };
    let engine = commands::init_engine(config, cli.log_file_path, Arc::new(HeadlessDriver));

    let result = match cli.command {
        Commands::ExecuteWorkflow { name, params } => {
            commands::workflow::execute(&engine, &name, &params).await
        }
        Commands::Workflows { action } => match action {
            WorkflowsAction::List => commands::workflow::list(&engine),
            WorkflowsAction::Validate { name } => commands::workflow::validate(&engine, &name),
        },
        Commands::Log { action } => match action {
            LogAction::Show { path, failures } => commands::log::show(&path, failures).await,
            LogAction::Summary { path } => commands::log::summary(&path).await,
        },
        Commands::Capabilities => commands::action::list_capabilities(&engine),
        Commands::Action(action) => {
            let (name, params) = action.into_call();
            commands::action::run(&engine, name, params).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
