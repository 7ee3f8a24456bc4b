//! Engine configuration: where manifests, workflow files and task logs live.

use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_FILE: &str = "workflows_manifest.json";
pub const DEFAULT_WORKFLOWS_DIR: &str = "successful_workflows";
pub const DEFAULT_LOGS_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Manifest mapping workflow names to step files
    pub manifest_path: PathBuf,
    /// Directory step files are resolved against
    pub workflows_dir: PathBuf,
    /// Directory `start_task_log` creates task logs in
    pub logs_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_FILE),
            workflows_dir: PathBuf::from(DEFAULT_WORKFLOWS_DIR),
            logs_dir: PathBuf::from(DEFAULT_LOGS_DIR),
        }
    }
}

impl EngineConfig {
    /// Default layout rooted at `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            manifest_path: root.join(DEFAULT_MANIFEST_FILE),
            workflows_dir: root.join(DEFAULT_WORKFLOWS_DIR),
            logs_dir: root.join(DEFAULT_LOGS_DIR),
        }
    }
}
