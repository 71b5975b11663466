use fxhash::FxHashMap;
use leadhub_kernel::domain::events::{EventKind, ServerEvent};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// Callback invoked with every server event of the kind it was registered for.
pub type EventHandler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Handle returned by [`crate::EventClient::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next: AtomicU64,
    by_kind: RwLock<FxHashMap<EventKind, Vec<(ListenerId, EventHandler)>>>,
}

impl Listeners {
    pub(crate) fn on(&self, kind: EventKind, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next.fetch_add(1, Ordering::Relaxed));
        self.by_kind.write().entry(kind).or_default().push((id, handler));
        id
    }

    pub(crate) fn off(&self, id: ListenerId) -> bool {
        let mut by_kind = self.by_kind.write();
        for handlers in by_kind.values_mut() {
            if let Some(pos) = handlers.iter().position(|(existing, _)| *existing == id) {
                handlers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Calls every handler registered for the event's kind.
    ///
    /// Handlers run outside the lock, so they may register or remove listeners.
    pub(crate) fn dispatch(&self, event: &ServerEvent) -> usize {
        let handlers: Vec<EventHandler> = self
            .by_kind
            .read()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub(crate) fn clear(&self) {
        self.by_kind.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_kind.read().values().map(Vec::len).sum()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("registered", &self.len()).finish()
    }
}

/// Fan-in point of the transports: listeners first, then channel subscribers.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    pub(crate) listeners: Listeners,
    events: broadcast::Sender<Arc<ServerEvent>>,
}

impl Dispatcher {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { listeners: Listeners::default(), events }
    }

    pub(crate) fn deliver(&self, event: ServerEvent) {
        let handled = self.listeners.dispatch(&event);
        let subscribers = self.events.send(Arc::new(event)).unwrap_or(0);
        trace!(handled, subscribers, "Server event delivered");
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Arc<ServerEvent>> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadhub_kernel::domain::leads::{Lead, LeadStatus, StatusChange, SystemMessage};
    use std::sync::atomic::AtomicUsize;

    fn counter(hits: &Arc<AtomicUsize>) -> EventHandler {
        let hits = Arc::clone(hits);
        Arc::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn status_event() -> ServerEvent {
        ServerEvent::LeadStatus(StatusChange::new("42", LeadStatus::Qualified))
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let listeners = Listeners::default();
        let status_hits = Arc::new(AtomicUsize::new(0));
        let lead_hits = Arc::new(AtomicUsize::new(0));
        listeners.on(EventKind::LeadStatus, counter(&status_hits));
        listeners.on(EventKind::LeadNew, counter(&lead_hits));

        assert_eq!(listeners.dispatch(&status_event()), 1);
        assert_eq!(status_hits.load(Ordering::SeqCst), 1);
        assert_eq!(lead_hits.load(Ordering::SeqCst), 0);

        listeners.dispatch(&ServerEvent::LeadNew(Lead::new("1", "555")));
        assert_eq!(lead_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_unregisters_exactly_one_listener() {
        let listeners = Listeners::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let first = listeners.on(EventKind::LeadStatus, counter(&hits));
        let _second = listeners.on(EventKind::LeadStatus, counter(&hits));

        assert!(listeners.off(first));
        assert!(!listeners.off(first), "already removed");

        listeners.dispatch(&status_event());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn handlers_may_unregister_themselves() {
        let listeners = Arc::new(Listeners::default());
        let slot = Arc::new(parking_lot::Mutex::new(None::<ListenerId>));

        let (registry, own_id) = (Arc::clone(&listeners), Arc::clone(&slot));
        let id = listeners.on(
            EventKind::Message,
            Arc::new(move |_| {
                if let Some(id) = *own_id.lock() {
                    registry.off(id);
                }
            }),
        );
        *slot.lock() = Some(id);

        let greeting = ServerEvent::Message(SystemMessage::now("system", "hi"));
        assert_eq!(listeners.dispatch(&greeting), 1);
        assert_eq!(listeners.dispatch(&greeting), 0);
    }

    #[tokio::test]
    async fn deliver_feeds_subscribers_unmodified() {
        let dispatcher = Dispatcher::new(8);
        let mut rx = dispatcher.subscribe();

        dispatcher.deliver(status_event());
        let received = rx.recv().await.expect("event");
        assert_eq!(*received, status_event());
    }
}
