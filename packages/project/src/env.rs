//! Environment variables referenced by `$$env` bindings.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use toolpad_appdom::AppDom;
use tracing::{debug, warn};

/// Source of variable values
pub trait Environment: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Process environment layered over the project's `.env` file
#[derive(Debug, Clone, Default)]
pub struct DotenvEnvironment {
    file_vars: HashMap<String, String>,
}

impl DotenvEnvironment {
    /// Read `path`. A missing file yields an empty layer; malformed lines are
    /// skipped with a warning.
    pub fn load(path: &Path) -> Self {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read env file");
                return Self::default();
            }
        };

        let mut file_vars = HashMap::new();
        for item in iter {
            match item {
                Ok((key, value)) => {
                    file_vars.insert(key, value);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping env file line"),
            }
        }
        debug!(path = %path.display(), count = file_vars.len(), "Loaded env file");
        Self { file_vars }
    }
}

impl Environment for DotenvEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .or_else(|| self.file_vars.get(name).cloned())
    }
}

/// Names of all variables the tree binds to
pub fn referenced_env_vars(dom: &AppDom) -> BTreeSet<String> {
    dom.nodes()
        .flat_map(|node| node.bindings())
        .filter_map(|binding| binding.env_var())
        .map(str::to_string)
        .collect()
}

pub fn missing_env_vars(dom: &AppDom, env: &dyn Environment) -> BTreeSet<String> {
    referenced_env_vars(dom)
        .into_iter()
        .filter(|name| !env.contains(name))
        .collect()
}

/// Warns about missing variables once per distinct missing set.
#[derive(Debug, Default)]
pub struct MissingVarAlert {
    last: BTreeSet<String>,
}

impl MissingVarAlert {
    /// Record the current missing set. Returns the newly missing names if a
    /// warning was logged.
    pub fn update(&mut self, missing: BTreeSet<String>) -> Option<Vec<String>> {
        if missing == self.last {
            return None;
        }
        let added: Vec<String> = missing.difference(&self.last).cloned().collect();
        self.last = missing;
        if added.is_empty() {
            return None;
        }
        warn!(
            variables = %added.join(", "),
            "Missing environment variables referenced by the app"
        );
        Some(added)
    }
}
