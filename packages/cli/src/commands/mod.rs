pub mod apply;
pub mod component;
pub mod dev;
pub mod init;
pub mod inspect;
pub mod page;

pub use apply::{apply, ApplyArgs};
pub use component::{new_component, NewComponentArgs};
pub use dev::{dev, DevArgs};
pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use page::{new_page, NewPageArgs};

use anyhow::{Context, Result};
use std::path::PathBuf;
use toolpad_project::{find_project_root, Project, ProjectMode, ProjectOptions};

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub dir: Option<PathBuf>,
    pub read_only: bool,
}

impl GlobalArgs {
    pub fn mode(&self) -> ProjectMode {
        if self.read_only {
            ProjectMode::ReadOnly
        } else {
            ProjectMode::Edit
        }
    }

    /// `--dir`, or the nearest ancestor of the working directory with a
    /// `toolpad/` folder
    pub fn root(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let cwd = std::env::current_dir().context("Cannot get current directory")?;
                Ok(find_project_root(&cwd))
            }
        }
    }

    pub async fn open(&self, mode: ProjectMode) -> Result<Project> {
        let root = self.root()?;
        let options = ProjectOptions { mode, config: None };
        Project::open(&root, options)
            .await
            .with_context(|| format!("Failed to open project at {}", root.display()))
    }

    /// Open for a command that writes; fails under `--read-only`.
    pub async fn open_for_edit(&self, command: &str) -> Result<Project> {
        if self.read_only {
            anyhow::bail!("`{command}` writes project files and cannot run with --read-only");
        }
        self.open(ProjectMode::Edit).await
    }
}
