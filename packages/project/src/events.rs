use crate::fingerprint::Fingerprint;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CAPACITY: usize = 256;

/// Notifications about the project, delivered in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    /// The cached tree was replaced
    Change { fingerprint: Fingerprint },
    /// The replacement came from files edited outside this process
    ExternalChange { fingerprint: Fingerprint },
    /// The set of code component names changed
    ComponentsListChanged,
    /// Resources or environment changed; query results may be stale
    QueriesInvalidated,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProjectEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProjectEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ProjectEvent) {
        trace!(?event, "Emitting project event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(ProjectEvent::ComponentsListChanged);
        bus.emit(ProjectEvent::QueriesInvalidated);
        assert_eq!(rx.recv().await.unwrap(), ProjectEvent::ComponentsListChanged);
        assert_eq!(rx.recv().await.unwrap(), ProjectEvent::QueriesInvalidated);
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::new().emit(ProjectEvent::QueriesInvalidated);
    }
}
