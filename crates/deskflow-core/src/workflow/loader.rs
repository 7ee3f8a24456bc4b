//! Workflow loader: resolves a workflow name through the manifest and
//! parses its step file.

use std::path::{Path, PathBuf};

use super::schema::{Manifest, ManifestEntry, Workflow};
use crate::capability::CapabilityRegistry;
use crate::config::EngineConfig;
use crate::error::WorkflowError;

#[derive(Debug, Clone)]
pub struct WorkflowLoader {
    manifest_path: PathBuf,
    workflows_dir: PathBuf,
}

impl WorkflowLoader {
    pub fn new(manifest_path: impl Into<PathBuf>, workflows_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            workflows_dir: workflows_dir.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.manifest_path, &config.workflows_dir)
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Read and parse the manifest.
    pub fn manifest(&self) -> Result<Manifest, WorkflowError> {
        let content = std::fs::read_to_string(&self.manifest_path).map_err(|e| {
            WorkflowError::WorkflowLoadError(format!(
                "Failed to read manifest '{}': {}",
                self.manifest_path.display(),
                e
            ))
        })?;
        Manifest::from_json(&content).map_err(WorkflowError::WorkflowLoadError)
    }

    /// All manifest entries, in manifest order.
    pub fn list(&self) -> Result<Vec<ManifestEntry>, WorkflowError> {
        Ok(self.manifest()?.workflows)
    }

    /// Load every step of `name`. Nothing is executed.
    pub fn load(&self, name: &str) -> Result<Workflow, WorkflowError> {
        let manifest = self.manifest()?;
        let entry = manifest
            .find(name)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(name.to_string()))?;

        let path = self.workflows_dir.join(&entry.file);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            WorkflowError::WorkflowLoadError(format!(
                "Failed to read workflow file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let workflow = if is_yaml(&path) {
            Workflow::from_yaml(name, &content)
        } else {
            Workflow::from_json(name, &content)
        }
        .map_err(|e| WorkflowError::WorkflowLoadError(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            "[WorkflowLoader] Loaded '{}' ({} steps) from {}",
            name,
            workflow.steps.len(),
            path.display()
        );
        Ok(workflow)
    }

    /// Load `name` and check every step against `registry` without running it.
    pub fn validate(
        &self,
        name: &str,
        registry: &CapabilityRegistry,
    ) -> Result<Workflow, WorkflowError> {
        let workflow = self.load(name)?;
        for (i, step) in workflow.steps.iter().enumerate() {
            let spec = registry
                .spec(&step.action)
                .ok_or_else(|| WorkflowError::UnknownAction(step.action.clone()))?;
            spec.validate(&step.params)
                .map_err(|reason| WorkflowError::InvalidParams {
                    action: step.action.clone(),
                    reason: format!("step {}: {}", i + 1, reason),
                })?;
        }
        Ok(workflow)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::HeadlessDriver;
    use std::sync::Arc;

    fn fixture() -> (tempfile::TempDir, WorkflowLoader) {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::rooted_at(dir.path());
        std::fs::create_dir_all(&config.workflows_dir).unwrap();
        std::fs::write(
            &config.manifest_path,
            r#"{"workflows": [
                {"name": "greet", "file": "greet.json", "description": "Type a greeting"},
                {"name": "yaml_flow", "file": "flow.yaml"},
                {"name": "broken", "file": "broken.json"},
                {"name": "missing_file", "file": "nowhere.json"},
                {"name": "teleport", "file": "teleport.json"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            config.workflows_dir.join("greet.json"),
            r#"[{"action": "type_text", "params": {"text": "{{msg}}"}}]"#,
        )
        .unwrap();
        std::fs::write(
            config.workflows_dir.join("flow.yaml"),
            "- action: wait\n  params:\n    seconds: 0\n",
        )
        .unwrap();
        std::fs::write(config.workflows_dir.join("broken.json"), "[{").unwrap();
        std::fs::write(
            config.workflows_dir.join("teleport.json"),
            r#"[{"action": "teleport"}]"#,
        )
        .unwrap();
        (dir, WorkflowLoader::from_config(&config))
    }

    #[test]
    fn test_load_json_and_yaml() {
        let (_dir, loader) = fixture();
        let greet = loader.load("greet").unwrap();
        assert_eq!(greet.name, "greet");
        assert_eq!(greet.steps[0].action, "type_text");

        let flow = loader.load("yaml_flow").unwrap();
        assert_eq!(flow.steps[0].action, "wait");
    }

    #[test]
    fn test_load_errors() {
        let (_dir, loader) = fixture();
        assert!(matches!(
            loader.load("nope"),
            Err(WorkflowError::WorkflowNotFound(_))
        ));
        assert!(matches!(
            loader.load("broken"),
            Err(WorkflowError::WorkflowLoadError(_))
        ));
        assert!(matches!(
            loader.load("missing_file"),
            Err(WorkflowError::WorkflowLoadError(_))
        ));
    }

    #[test]
    fn test_missing_manifest_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = WorkflowLoader::new(dir.path().join("none.json"), dir.path());
        assert!(matches!(
            loader.list(),
            Err(WorkflowError::WorkflowLoadError(_))
        ));
    }

    #[test]
    fn test_list_preserves_order() {
        let (_dir, loader) = fixture();
        let names: Vec<_> = loader.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names[..2], ["greet", "yaml_flow"]);
    }

    #[test]
    fn test_validate_against_registry() {
        let (dir, loader) = fixture();
        let registry = CapabilityRegistry::with_builtins(
            Arc::new(HeadlessDriver),
            &EngineConfig::rooted_at(dir.path()),
        );
        assert!(loader.validate("greet", &registry).is_ok());
        assert!(matches!(
            loader.validate("teleport", &registry),
            Err(WorkflowError::UnknownAction(a)) if a == "teleport"
        ));
    }
}
