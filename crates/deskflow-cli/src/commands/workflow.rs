//! `deskflow execute-workflow` and `deskflow workflows`: run, list and
//! validate recorded workflows.

use deskflow_core::{ParameterSet, WorkflowExecutor, WorkflowLoader};

use super::{truncate, Engine};

/// Run the workflow `name` with the JSON object `params_json` as parameters.
pub async fn execute(engine: &Engine, name: &str, params_json: &str) -> Result<(), String> {
    let params = ParameterSet::from_json(params_json).map_err(|e| e.to_string())?;
    let workflow = WorkflowLoader::from_config(&engine.config)
        .load(name)
        .map_err(|e| e.to_string())?;

    let mut executor = WorkflowExecutor::new(engine.registry.clone(), engine.log.clone());
    let report = executor
        .execute(&workflow, &params)
        .await
        .map_err(|e| e.to_string())?;

    let flagged: Vec<_> = report
        .unsuccessful_steps()
        .map(|s| format!("{}. {} ({})", s.step, s.action, s.output.status))
        .collect();
    if !flagged.is_empty() {
        tracing::info!(
            "[Workflow] '{}' completed with {} non-success step(s): {}",
            report.workflow_name,
            flagged.len(),
            flagged.join(", ")
        );
    }
    Ok(())
}

/// List the workflows named in the manifest.
pub fn list(engine: &Engine) -> Result<(), String> {
    let loader = WorkflowLoader::from_config(&engine.config);
    let entries = loader.list().map_err(|e| e.to_string())?;

    println!(
        "{} workflow(s) in '{}'",
        entries.len(),
        loader.manifest_path().display()
    );
    println!();
    println!("┌──────────────────────┬──────────────────────────┬──────────────────────────────┐");
    println!("│ Name                 │ File                     │ Description                  │");
    println!("├──────────────────────┼──────────────────────────┼──────────────────────────────┤");
    for entry in &entries {
        println!(
            "│ {:<20} │ {:<24} │ {:<28} │",
            truncate(&entry.name, 20),
            truncate(&entry.file, 24),
            truncate(entry.description().unwrap_or("-"), 28)
        );
    }
    println!("└──────────────────────┴──────────────────────────┴──────────────────────────────┘");
    Ok(())
}

/// Load a workflow and check every step against the registry without running it.
pub fn validate(engine: &Engine, name: &str) -> Result<(), String> {
    let workflow = WorkflowLoader::from_config(&engine.config)
        .validate(name, &engine.registry)
        .map_err(|e| e.to_string())?;

    println!("✅ Workflow '{}' is valid", workflow.name);
    println!("   Steps: {}", workflow.steps.len());
    for (i, step) in workflow.steps.iter().enumerate() {
        let keys: Vec<&str> = step.params.keys().map(String::as_str).collect();
        println!("   {}. {} ({})", i + 1, step.action, keys.join(", "));
    }
    Ok(())
}
