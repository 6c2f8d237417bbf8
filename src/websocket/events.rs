use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{EventKind, Listener, ListenerId, SocketEvent};

/// Listener list keyed by event kind.
///
/// Listeners run in registration order on the emitting coroutine. The list is
/// snapshotted before dispatch, so a listener may add or remove listeners
/// (including itself) while running.
#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, EventKind, Listener)>>,
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, kind, listener));
        id
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _, _)| *lid != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener of its kind.
    pub fn emit(&self, event: &SocketEvent) {
        let kind = event.kind();
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| Listener::clone(l))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }
}
