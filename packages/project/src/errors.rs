//! Error types for the project layer

use std::path::PathBuf;
use thiserror::Error;
use toolpad_appdom::DomError;

/// Problem with a single project file.
///
/// `Invalid` files are logged and skipped by the loader; an `UnknownTag`
/// aborts the load.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FileError {
    #[error("{}: invalid {field}: {message}", path.display())]
    Invalid {
        path: PathBuf,
        field: String,
        message: String,
    },

    #[error("{}: unrecognized {field} kind {tag:?}", path.display())]
    UnknownTag {
        path: PathBuf,
        field: String,
        tag: String,
    },
}

impl FileError {
    pub fn invalid(path: &std::path::Path, field: impl Into<String>, message: impl ToString) -> Self {
        FileError::Invalid {
            path: path.to_path_buf(),
            field: field.into(),
            message: message.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, FileError::UnknownTag { .. })
    }
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("Project is read-only")]
    ReadOnly,

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Watcher error: {0}")]
    Watcher(#[from] WatcherError),

    #[error("Component {0:?} already exists")]
    ComponentExists(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Watch error: {0}")]
    WatchError(String),
}

pub type ProjectResult<T> = Result<T, ProjectError>;
