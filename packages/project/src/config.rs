use crate::errors::ProjectError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "toolpad.config.json";

/// Whether the project may be written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectMode {
    /// Development: saves allowed, files watched
    Edit,
    /// Serving a built app: no writes, no watcher
    ReadOnly,
}

impl ProjectMode {
    pub fn is_editable(self) -> bool {
        matches!(self, ProjectMode::Edit)
    }
}

/// How the fingerprint summarizes DOM files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FingerprintStrategy {
    /// Path + modification time (cheap, may miss same-tick edits)
    #[default]
    Mtime,
    /// Path + file contents
    Content,
}

/// Project configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Quiet period before a burst of file events triggers a reload
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum spacing of query invalidation events
    #[serde(default = "default_queries_throttle_ms")]
    pub queries_throttle_ms: u64,

    /// Globs (relative to the project root) of files that define the DOM
    #[serde(default = "default_dom_patterns")]
    pub dom_patterns: Vec<String>,

    /// Folder of user functions; changes there invalidate queries
    #[serde(default = "default_resources_dir")]
    pub resources_dir: String,

    /// Generated output folder inside `toolpad/`, git-ignored
    #[serde(default = "default_generated_dir")]
    pub generated_dir: String,

    #[serde(default)]
    pub fingerprint: FingerprintStrategy,
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_queries_throttle_ms() -> u64 {
    250
}

fn default_dom_patterns() -> Vec<String> {
    vec![
        "toolpad/pages/*/page.yml".to_string(),
        "toolpad/theme.yml".to_string(),
        "toolpad/components/*".to_string(),
    ]
}

fn default_resources_dir() -> String {
    "toolpad/resources".to_string()
}

fn default_generated_dir() -> String {
    ".generated".to_string()
}

impl ProjectConfig {
    /// Load config from a project root, falling back to defaults
    pub fn load(root: &Path) -> Result<Self, ProjectError> {
        let config_path = root.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: ProjectConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(ProjectConfig::default())
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn queries_throttle(&self) -> Duration {
        Duration::from_millis(self.queries_throttle_ms)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            queries_throttle_ms: default_queries_throttle_ms(),
            dom_patterns: default_dom_patterns(),
            resources_dir: default_resources_dir(),
            generated_dir: default_generated_dir(),
            fingerprint: FingerprintStrategy::default(),
        }
    }
}
