//! Change notification for UI subscribers.
//!
//! # Invariants
//! - Listeners run synchronously, in subscription order, before the
//!   triggering operation returns.
//! - A listener may subscribe or unsubscribe from inside its callback.

use crate::buffer::pending::SyncState;
use crate::model::record::{ContextId, RecordId};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// State change observed by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Loaded {
        context_id: ContextId,
        record_count: usize,
    },
    Edited {
        record_id: RecordId,
    },
    FlushStarted {
        record_id: RecordId,
    },
    /// A write succeeded; `state` is `Clean` or `Dirty` when a follow-up is due.
    Flushed {
        record_id: RecordId,
        state: SyncState,
    },
    FlushFailed {
        record_id: RecordId,
        will_retry: bool,
    },
    SyncFailed {
        record_id: RecordId,
    },
    Created {
        record_id: RecordId,
    },
    Renamed {
        record_id: RecordId,
    },
    Deleted {
        record_ids: Vec<RecordId>,
    },
    Discarded {
        record_id: RecordId,
    },
    PendingDropped {
        record_ids: Vec<RecordId>,
    },
}

type Listener = Rc<dyn Fn(&ChangeEvent)>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Fan-out of change events to registered listeners.
#[derive(Default)]
pub struct ChangeNotifier {
    registry: Rc<RefCell<ListenerRegistry>>,
}

impl ChangeNotifier {
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Rc::new(listener));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn emit(&self, event: &ChangeEvent) {
        let listeners: Vec<Listener> = self.registry.borrow().listeners.values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener registered.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<ListenerRegistry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().listeners.remove(&self.id);
        }
    }
}
