//! # Toolpad Project
//!
//! Keeps an [`AppDom`](toolpad_appdom::AppDom) in sync with the files of a
//! Toolpad project folder.
//!
//! ## Architecture
//!
//! ```text
//! page.yml / theme.yml / components/*     Project (handle)
//!        │        ▲                         │  load / save / apply_diff
//!   loader│        │writer                  ▼
//!        ▼        │                  ┌──────────────┐
//!   schema ─ expand ──────────────►  │ DomSnapshot  │  fair mutex
//!                                    └──────────────┘
//!        notify ─► watcher loop ─► reconcile ─► ProjectEvent (broadcast)
//! ```
//!
//! ## Modules
//!
//! - **schema**: file document shapes and validation
//! - **expand**: file documents ⇄ tree nodes
//! - **loader** / **writer**: folder ⇄ tree
//! - **fingerprint**: change detection over DOM files
//! - **watcher**: debounced reconciliation, throttled query invalidation
//! - **project**: the [`Project`] handle

pub mod config;
mod env;
mod errors;
mod events;
mod expand;
mod fingerprint;
pub mod layout;
mod loader;
mod project;
pub mod schema;
mod watcher;
mod writer;

pub use config::{FingerprintStrategy, ProjectConfig, ProjectMode};
pub use env::{missing_env_vars, referenced_env_vars, DotenvEnvironment, Environment};
pub use errors::{FileError, ProjectError, ProjectResult, WatcherError};
pub use events::ProjectEvent;
pub use fingerprint::Fingerprint;
pub use layout::ProjectLayout;
pub use loader::load_dom;
pub use project::{find_project_root, DomSnapshot, Project, ProjectOptions};
pub use writer::write_dom;
