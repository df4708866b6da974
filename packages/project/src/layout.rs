//! Where project files live on disk.
//!
//! ```text
//! <root>/
//!   .env
//!   toolpad/
//!     .gitignore
//!     theme.yml
//!     pages/<page>/page.yml
//!     components/<Component>.tsx
//!     resources/
//! ```

use crate::config::ProjectConfig;
use std::path::{Path, PathBuf};

pub const TOOLPAD_DIR: &str = "toolpad";
pub const PAGE_FILE_NAME: &str = "page.yml";
pub const THEME_FILE_NAME: &str = "theme.yml";
pub const COMPONENT_EXTENSION: &str = "tsx";

#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
    resources_dir: PathBuf,
    generated_dir: String,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, config: &ProjectConfig) -> Self {
        let root = root.into();
        Self {
            resources_dir: root.join(&config.resources_dir),
            generated_dir: config.generated_dir.clone(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn toolpad_dir(&self) -> PathBuf {
        self.root.join(TOOLPAD_DIR)
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.toolpad_dir().join("pages")
    }

    pub fn page_file(&self, page_name: &str) -> PathBuf {
        self.pages_dir().join(page_name).join(PAGE_FILE_NAME)
    }

    pub fn components_dir(&self) -> PathBuf {
        self.toolpad_dir().join("components")
    }

    pub fn component_file(&self, name: &str) -> PathBuf {
        self.components_dir()
            .join(format!("{name}.{COMPONENT_EXTENSION}"))
    }

    pub fn theme_file(&self) -> PathBuf {
        self.toolpad_dir().join(THEME_FILE_NAME)
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    pub fn generated_dir_name(&self) -> &str {
        &self.generated_dir
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.toolpad_dir().join(&self.generated_dir)
    }

    pub fn gitignore_file(&self) -> PathBuf {
        self.toolpad_dir().join(".gitignore")
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(".env")
    }

    /// Path relative to the root with `/` separators, as globs expect
    pub fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}
