//! File watching and the invalidation loop.
//!
//! `notify` events are forwarded as paths into a tokio channel. The loop
//! sorts each path into one of two buckets:
//!
//! - DOM files: reconcile after a quiet period (trailing debounce)
//! - resources / `.env`: emit `QueriesInvalidated`, at most once per throttle
//!   interval, at the end of the interval
//!
//! The loop only holds a weak reference to the project and ends when the
//! project is dropped or the watcher is stopped.

use crate::errors::{ProjectResult, WatcherError};
use crate::events::ProjectEvent;
use crate::fingerprint::DomFileMatcher;
use crate::layout::ProjectLayout;
use crate::project::ProjectInner;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::future::pending;
use std::path::{Path, PathBuf};
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathClass {
    Dom,
    Queries,
    Ignored,
}

#[derive(Debug, Clone)]
pub(crate) struct PathClassifier {
    layout: ProjectLayout,
    matcher: DomFileMatcher,
}

impl PathClassifier {
    pub(crate) fn new(layout: ProjectLayout, matcher: DomFileMatcher) -> Self {
        Self { layout, matcher }
    }

    pub(crate) fn classify(&self, path: &Path) -> PathClass {
        let Some(relative) = self.layout.relative(path) else {
            return PathClass::Ignored;
        };
        let pages_dir = self.layout.pages_dir();
        let is_dom_dir = path == pages_dir
            || path.parent() == Some(pages_dir.as_path())
            || path == self.layout.components_dir();

        if self.matcher.is_match(&relative) || is_dom_dir {
            PathClass::Dom
        } else if path.starts_with(self.layout.resources_dir()) || path == self.layout.env_file() {
            PathClass::Queries
        } else {
            PathClass::Ignored
        }
    }
}

/// Running watcher. Dropping it stops the loop.
pub(crate) struct WatcherHandle {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub(crate) fn stop(self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopTimings {
    pub debounce: Duration,
    pub throttle: Duration,
}

/// Watch the project root and spawn the invalidation loop.
pub(crate) fn spawn_watcher(
    project: Weak<ProjectInner>,
    classifier: PathClassifier,
    timings: LoopTimings,
) -> ProjectResult<WatcherHandle> {
    let root = classifier.layout.root().to_path_buf();
    let (tx, rx) = unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
            Err(e) => warn!(error = %e, "File watcher error"),
        },
        Config::default(),
    )
    .map_err(WatcherError::from)?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| WatcherError::WatchError(format!("{}: {e}", root.display())))?;
    info!(root = %root.display(), "Watching project files");

    let task = tokio::spawn(run_loop(project, rx, classifier, timings));
    Ok(WatcherHandle {
        _watcher: watcher,
        task,
    })
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

pub(crate) async fn run_loop(
    project: Weak<ProjectInner>,
    mut paths: UnboundedReceiver<PathBuf>,
    classifier: PathClassifier,
    timings: LoopTimings,
) {
    let mut reconcile_at: Option<Instant> = None;
    let mut invalidate_at: Option<Instant> = None;

    loop {
        tokio::select! {
            path = paths.recv() => {
                let Some(path) = path else { break };
                match classifier.classify(&path) {
                    PathClass::Dom => {
                        debug!(path = %path.display(), "DOM file changed");
                        reconcile_at = Some(Instant::now() + timings.debounce);
                    }
                    PathClass::Queries => {
                        if invalidate_at.is_none() {
                            invalidate_at = Some(Instant::now() + timings.throttle);
                        }
                    }
                    PathClass::Ignored => {}
                }
            }

            _ = sleep_until_deadline(reconcile_at) => {
                reconcile_at = None;
                let Some(project) = project.upgrade() else { break };
                if let Err(e) = project.reconcile(false).await {
                    warn!(error = %e, "Failed to reload project; keeping previous state");
                }
            }

            _ = sleep_until_deadline(invalidate_at) => {
                invalidate_at = None;
                let Some(project) = project.upgrade() else { break };
                project.events().emit(ProjectEvent::QueriesInvalidated);
            }
        }
    }
    debug!("Watcher loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FingerprintStrategy, ProjectConfig, ProjectMode};
    use crate::project::{Project, ProjectOptions};
    use std::sync::Arc;
    use tokio::sync::broadcast::error::TryRecvError;

    fn classifier(root: &Path) -> PathClassifier {
        let config = ProjectConfig::default();
        PathClassifier::new(
            ProjectLayout::new(root, &config),
            DomFileMatcher::new(&config.dom_patterns).unwrap(),
        )
    }

    fn page_text(title: &str) -> String {
        format!("apiVersion: v1\nkind: page\nspec:\n  title: {title}\n")
    }

    async fn read_only_project(root: &Path) -> Project {
        let config = ProjectConfig {
            fingerprint: FingerprintStrategy::Content,
            ..ProjectConfig::default()
        };
        Project::open(
            root,
            ProjectOptions {
                mode: ProjectMode::ReadOnly,
                config: Some(config),
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_classify_paths() {
        let c = classifier(Path::new("/app"));
        assert_eq!(c.classify(Path::new("/app/toolpad/pages/home/page.yml")), PathClass::Dom);
        assert_eq!(c.classify(Path::new("/app/toolpad/pages/home")), PathClass::Dom);
        assert_eq!(c.classify(Path::new("/app/toolpad/components/A.tsx")), PathClass::Dom);
        assert_eq!(c.classify(Path::new("/app/toolpad/theme.yml")), PathClass::Dom);
        assert_eq!(
            c.classify(Path::new("/app/toolpad/resources/functions.ts")),
            PathClass::Queries
        );
        assert_eq!(c.classify(Path::new("/app/.env")), PathClass::Queries);
        assert_eq!(c.classify(Path::new("/app/README.md")), PathClass::Ignored);
        assert_eq!(c.classify(Path::new("/other/.env")), PathClass::Ignored);
    }

    #[tokio::test]
    async fn test_burst_causes_single_reconcile() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let page = root.join("toolpad/pages/home/page.yml");
        std::fs::create_dir_all(page.parent().unwrap()).unwrap();
        std::fs::write(&page, page_text("One")).unwrap();

        let project = read_only_project(&root).await;
        project.load().await.unwrap();
        let mut events = project.subscribe();

        let (tx, rx) = unbounded_channel();
        let timings = LoopTimings {
            debounce: Duration::from_millis(100),
            throttle: Duration::from_millis(250),
        };
        let task = tokio::spawn(run_loop(
            Arc::downgrade(&project.inner),
            rx,
            classifier(&root),
            timings,
        ));

        std::fs::write(&page, page_text("Two")).unwrap();
        tx.send(page.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&page, page_text("Three")).unwrap();
        tx.send(page.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(matches!(events.try_recv(), Ok(ProjectEvent::Change { .. })));
        assert!(matches!(events.try_recv(), Ok(ProjectEvent::ExternalChange { .. })));
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        let snapshot = project.load().await.unwrap();
        let home = snapshot.dom.page_by_name("home").unwrap();
        assert_eq!(home.as_page().unwrap().title, "Three");

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_component_list_changes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let components = root.join("toolpad/components");
        std::fs::create_dir_all(&components).unwrap();
        std::fs::write(components.join("Chart.tsx"), "export default Chart;").unwrap();

        let project = read_only_project(&root).await;
        project.load().await.unwrap();
        let mut events = project.subscribe();

        let (tx, rx) = unbounded_channel();
        let timings = LoopTimings {
            debounce: Duration::from_millis(50),
            throttle: Duration::from_millis(250),
        };
        let task = tokio::spawn(run_loop(
            Arc::downgrade(&project.inner),
            rx,
            classifier(&root),
            timings,
        ));

        let map = components.join("Map.tsx");
        std::fs::write(&map, "export default Map;").unwrap();
        tx.send(map.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(matches!(events.try_recv(), Ok(ProjectEvent::Change { .. })));
        assert!(matches!(events.try_recv(), Ok(ProjectEvent::ExternalChange { .. })));
        assert_eq!(events.try_recv().unwrap(), ProjectEvent::ComponentsListChanged);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        // Same names, new source
        let chart = components.join("Chart.tsx");
        std::fs::write(&chart, "export default function Chart() {}").unwrap();
        tx.send(chart).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(matches!(events.try_recv(), Ok(ProjectEvent::Change { .. })));
        assert!(matches!(events.try_recv(), Ok(ProjectEvent::ExternalChange { .. })));
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        std::fs::remove_file(&map).unwrap();
        tx.send(map).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(matches!(events.try_recv(), Ok(ProjectEvent::Change { .. })));
        assert!(matches!(events.try_recv(), Ok(ProjectEvent::ExternalChange { .. })));
        assert_eq!(events.try_recv().unwrap(), ProjectEvent::ComponentsListChanged);

        let snapshot = project.load().await.unwrap();
        let names: Vec<_> = snapshot.dom.code_components().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Chart"]);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_query_invalidation_is_throttled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let project = read_only_project(&root).await;
        let mut events = project.subscribe();

        let (tx, rx) = unbounded_channel();
        let timings = LoopTimings {
            debounce: Duration::from_millis(50),
            throttle: Duration::from_millis(100),
        };
        tokio::spawn(run_loop(Arc::downgrade(&project.inner), rx, classifier(&root), timings));

        for _ in 0..5 {
            tx.send(root.join("toolpad/resources/functions.ts")).unwrap();
        }
        tx.send(root.join(".env")).unwrap();
        // Nothing on the leading edge
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(events.try_recv().unwrap(), ProjectEvent::QueriesInvalidated);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_loop_stops_when_project_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let project = read_only_project(&root).await;

        let (tx, rx) = unbounded_channel();
        let timings = LoopTimings {
            debounce: Duration::from_millis(10),
            throttle: Duration::from_millis(10),
        };
        let task = tokio::spawn(run_loop(Arc::downgrade(&project.inner), rx, classifier(&root), timings));

        drop(project);
        tx.send(root.join("toolpad/theme.yml")).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("loop should stop")
            .unwrap();
    }
}
