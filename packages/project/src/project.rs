//! # Project
//!
//! [`Project`] is the handle through which the tree is read and changed. It
//! owns the cached [`DomSnapshot`], the event bus and (in edit mode) the file
//! watcher.
//!
//! Every operation that touches the cache or the files, including watcher
//! reconciliations, runs inside one fair async mutex. Callers are served in
//! arrival order and each one sees the result of the one before.

use crate::config::{ProjectConfig, ProjectMode};
use crate::env::{missing_env_vars, DotenvEnvironment, MissingVarAlert};
use crate::errors::{ProjectError, ProjectResult};
use crate::events::{EventBus, ProjectEvent};
use crate::fingerprint::{compute_fingerprint, DomFileMatcher, Fingerprint};
use crate::layout::ProjectLayout;
use crate::loader::load_dom;
use crate::watcher::{spawn_watcher, LoopTimings, PathClassifier, WatcherHandle};
use crate::writer::{ensure_gitignore, write_component, write_dom};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use toolpad_appdom::{is_valid_file_name, AppDom, DiffOp, DomError, NodeKind};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ProjectOptions {
    pub mode: ProjectMode,
    /// Use this instead of reading `toolpad.config.json`
    pub config: Option<ProjectConfig>,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            mode: ProjectMode::Edit,
            config: None,
        }
    }
}

/// The tree together with the fingerprint of the files it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct DomSnapshot {
    pub dom: AppDom,
    pub fingerprint: Fingerprint,
}

#[derive(Default)]
struct ProjectState {
    snapshot: Option<DomSnapshot>,
    alert: MissingVarAlert,
    watcher: Option<WatcherHandle>,
}

pub(crate) struct ProjectInner {
    layout: ProjectLayout,
    config: ProjectConfig,
    mode: ProjectMode,
    matcher: DomFileMatcher,
    events: EventBus,
    state: Mutex<ProjectState>,
}

#[derive(Clone)]
pub struct Project {
    pub(crate) inner: Arc<ProjectInner>,
}

impl Project {
    /// Open the project rooted at `root`.
    ///
    /// In edit mode this creates `toolpad/` and its `.gitignore` if needed and
    /// starts watching the folder.
    pub async fn open(root: impl AsRef<Path>, options: ProjectOptions) -> ProjectResult<Self> {
        let root = root.as_ref();
        if options.mode.is_editable() {
            tokio::fs::create_dir_all(root).await?;
        }
        let root = tokio::fs::canonicalize(root).await?;

        let config = match options.config {
            Some(config) => config,
            None => ProjectConfig::load(&root)?,
        };
        let layout = ProjectLayout::new(&root, &config);
        let matcher = DomFileMatcher::new(&config.dom_patterns)?;

        if options.mode.is_editable() {
            tokio::fs::create_dir_all(layout.toolpad_dir()).await?;
            ensure_gitignore(&layout).await?;
        }

        let inner = Arc::new(ProjectInner {
            layout: layout.clone(),
            config,
            mode: options.mode,
            matcher: matcher.clone(),
            events: EventBus::new(),
            state: Mutex::new(ProjectState::default()),
        });

        if options.mode.is_editable() {
            let timings = LoopTimings {
                debounce: inner.config.debounce(),
                throttle: inner.config.queries_throttle(),
            };
            let handle = spawn_watcher(
                Arc::downgrade(&inner),
                PathClassifier::new(layout, matcher),
                timings,
            )?;
            inner.state.lock().await.watcher = Some(handle);
        }

        info!(root = %root.display(), mode = ?options.mode, "Opened project");
        Ok(Self { inner })
    }

    pub fn root(&self) -> &Path {
        self.inner.layout.root()
    }

    pub fn mode(&self) -> ProjectMode {
        self.inner.mode
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.inner.config
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.inner.layout
    }

    /// Current tree, read from disk on first use
    pub async fn load(&self) -> ProjectResult<DomSnapshot> {
        let mut state = self.inner.state.lock().await;
        if let Some(snapshot) = &state.snapshot {
            return Ok(snapshot.clone());
        }
        self.inner.load_locked(&mut state).await
    }

    /// Write `dom` to disk and make it the current tree.
    pub async fn save(&self, dom: &AppDom) -> ProjectResult<DomSnapshot> {
        self.inner.require_editable()?;
        let mut state = self.inner.state.lock().await;
        if state.snapshot.is_none() {
            self.inner.load_locked(&mut state).await?;
        }
        self.inner.save_locked(&mut state, dom.clone()).await
    }

    /// Apply `ops` to the current tree and save the result.
    pub async fn apply_diff(&self, ops: &[DiffOp]) -> ProjectResult<DomSnapshot> {
        self.inner.require_editable()?;
        let mut state = self.inner.state.lock().await;
        let current = match state.snapshot.clone() {
            Some(snapshot) => snapshot.dom,
            None => self.inner.load_locked(&mut state).await?.dom,
        };
        let next = current.apply_diff(ops)?;
        debug!(ops = ops.len(), "Applied diff");
        self.inner.save_locked(&mut state, next).await
    }

    /// Re-read the project from disk even if no change was detected.
    pub async fn reload(&self) -> ProjectResult<DomSnapshot> {
        self.inner.reconcile(true).await
    }

    /// Create `components/<name>.tsx` and pick it up.
    pub async fn create_component(&self, name: &str) -> ProjectResult<DomSnapshot> {
        self.inner.require_editable()?;
        if !is_valid_file_name(name) {
            return Err(DomError::InvalidName {
                kind: NodeKind::CodeComponent,
                name: name.to_string(),
            }
            .into());
        }
        let mut state = self.inner.state.lock().await;
        write_component(&self.inner.layout, name).await?;
        self.inner.reconcile_locked(&mut state, false).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProjectEvent> {
        self.inner.events.subscribe()
    }

    /// Stop watching and drop the cached tree.
    pub async fn dispose(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(watcher) = state.watcher.take() {
            watcher.stop();
        }
        state.snapshot = None;
        info!(root = %self.root().display(), "Disposed project");
    }
}

impl ProjectInner {
    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    fn require_editable(&self) -> ProjectResult<()> {
        if self.mode.is_editable() {
            Ok(())
        } else {
            Err(ProjectError::ReadOnly)
        }
    }

    async fn fingerprint(&self) -> ProjectResult<Fingerprint> {
        compute_fingerprint(
            self.layout.root(),
            self.layout.generated_dir_name(),
            &self.matcher,
            self.config.fingerprint,
        )
        .await
    }

    /// Bring the cache up to date with the files. Without `force`, nothing is
    /// read if the fingerprint is unchanged.
    pub(crate) async fn reconcile(&self, force: bool) -> ProjectResult<DomSnapshot> {
        let mut state = self.state.lock().await;
        self.reconcile_locked(&mut state, force).await
    }

    async fn reconcile_locked(
        &self,
        state: &mut ProjectState,
        force: bool,
    ) -> ProjectResult<DomSnapshot> {
        let fingerprint = self.fingerprint().await?;
        if let Some(snapshot) = &state.snapshot {
            if !force && snapshot.fingerprint == fingerprint {
                debug!(%fingerprint, "Project files unchanged");
                return Ok(snapshot.clone());
            }
        }

        let previous_components = state.snapshot.as_ref().map(|s| component_names(&s.dom));
        let dom = load_dom(&self.layout).await?;
        let components_changed = previous_components.is_some_and(|names| names != component_names(&dom));

        let snapshot = self.replace_snapshot(state, dom, fingerprint.clone());
        info!(%fingerprint, "Reloaded project from disk");
        self.events.emit(ProjectEvent::Change {
            fingerprint: fingerprint.clone(),
        });
        self.events.emit(ProjectEvent::ExternalChange { fingerprint });
        if components_changed {
            self.events.emit(ProjectEvent::ComponentsListChanged);
        }
        Ok(snapshot)
    }

    async fn load_locked(&self, state: &mut ProjectState) -> ProjectResult<DomSnapshot> {
        let fingerprint = self.fingerprint().await?;
        let dom = load_dom(&self.layout).await?;
        Ok(self.replace_snapshot(state, dom, fingerprint))
    }

    async fn save_locked(&self, state: &mut ProjectState, dom: AppDom) -> ProjectResult<DomSnapshot> {
        let previous = state.snapshot.as_ref().map(|snapshot| &snapshot.dom);
        write_dom(&self.layout, previous, &dom).await?;
        let fingerprint = self.fingerprint().await?;
        let snapshot = self.replace_snapshot(state, dom, fingerprint.clone());
        info!(%fingerprint, "Saved project");
        self.events.emit(ProjectEvent::Change { fingerprint });
        Ok(snapshot)
    }

    fn replace_snapshot(&self, state: &mut ProjectState, dom: AppDom, fingerprint: Fingerprint) -> DomSnapshot {
        let env = DotenvEnvironment::load(&self.layout.env_file());
        state.alert.update(missing_env_vars(&dom, &env));

        let snapshot = DomSnapshot { dom, fingerprint };
        state.snapshot = Some(snapshot.clone());
        snapshot
    }
}

fn component_names(dom: &AppDom) -> BTreeSet<String> {
    dom.code_components()
        .into_iter()
        .map(|node| node.name.clone())
        .collect()
}

/// Root of the project containing `start`: the nearest ancestor with a
/// `toolpad/` folder, or `start` itself.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(crate::layout::TOOLPAD_DIR).is_dir())
        .unwrap_or(start)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FingerprintStrategy;
    use toolpad_appdom::{Node, NodeAttributes, PageAttributes, ParentProp};

    fn options(mode: ProjectMode) -> ProjectOptions {
        ProjectOptions {
            mode,
            config: Some(ProjectConfig {
                fingerprint: FingerprintStrategy::Content,
                ..ProjectConfig::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_open_initializes_folder() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
        assert!(project.layout().toolpad_dir().is_dir());
        assert!(project.layout().gitignore_file().is_file());
        project.dispose().await;
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::open(dir.path(), options(ProjectMode::ReadOnly)).await.unwrap();
        let snapshot = project.load().await.unwrap();

        let err = project.save(&snapshot.dom).await.unwrap_err();
        assert!(matches!(err, ProjectError::ReadOnly));
        assert!(matches!(project.apply_diff(&[]).await, Err(ProjectError::ReadOnly)));
        assert!(matches!(project.create_component("A").await, Err(ProjectError::ReadOnly)));
        assert!(!dir.path().join("toolpad").exists());
        assert_eq!(project.load().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_save_emits_change() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
        let mut events = project.subscribe();

        let dom = project.load().await.unwrap().dom;
        let page = Node::create("home", NodeAttributes::Page(PageAttributes::titled("Home")));
        let dom = dom
            .add_node(page, &dom.root_id().clone(), ParentProp::Pages, Default::default())
            .unwrap();
        let saved = project.save(&dom).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            ProjectEvent::Change {
                fingerprint: saved.fingerprint.clone()
            }
        );
        assert_eq!(project.load().await.unwrap(), saved);
        project.dispose().await;
    }

    #[tokio::test]
    async fn test_create_component() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::open(dir.path(), options(ProjectMode::Edit)).await.unwrap();
        project.load().await.unwrap();
        let mut events = project.subscribe();

        let snapshot = project.create_component("Chart").await.unwrap();
        assert_eq!(snapshot.dom.code_components()[0].name, "Chart");
        assert!(matches!(events.recv().await.unwrap(), ProjectEvent::Change { .. }));
        assert!(matches!(events.recv().await.unwrap(), ProjectEvent::ExternalChange { .. }));
        assert_eq!(events.recv().await.unwrap(), ProjectEvent::ComponentsListChanged);

        assert!(matches!(
            project.create_component("Chart").await,
            Err(ProjectError::ComponentExists(_))
        ));
        assert!(matches!(
            project.create_component("../x").await,
            Err(ProjectError::Dom(DomError::InvalidName { .. }))
        ));
        project.dispose().await;
    }

    #[test]
    fn test_find_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("toolpad").join("pages");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested), dir.path());
    }
}
