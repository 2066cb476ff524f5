//! Change-notification hub.
//!
//! Subscribers register a path prefix and an event mask and get a private
//! bounded mailbox. Emission never blocks: when a mailbox is full the event
//! is dropped for that subscriber.

use std::fmt;
use std::ops::BitOr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

use super::path;

/// Default mailbox size for a new watch.
pub const DEFAULT_CAPACITY: usize = 256;

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Write,
    Remove,
    Rename,
    Mkdir,
}

impl EventKind {
    pub const fn mask(self) -> EventMask {
        match self {
            EventKind::Create => EventMask::CREATE,
            EventKind::Write => EventMask::WRITE,
            EventKind::Remove => EventMask::REMOVE,
            EventKind::Rename => EventMask::RENAME,
            EventKind::Mkdir => EventMask::MKDIR,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Create => "create",
            EventKind::Write => "write",
            EventKind::Remove => "remove",
            EventKind::Rename => "rename",
            EventKind::Mkdir => "mkdir",
        };
        f.write_str(s)
    }
}

/// Set of event kinds a subscriber cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventMask(u8);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const CREATE: EventMask = EventMask(1 << 0);
    pub const WRITE: EventMask = EventMask(1 << 1);
    pub const REMOVE: EventMask = EventMask(1 << 2);
    pub const RENAME: EventMask = EventMask(1 << 3);
    pub const MKDIR: EventMask = EventMask(1 << 4);
    pub const ALL: EventMask = EventMask(0b1_1111);

    pub const fn intersects(self, other: EventMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

/// A single change in the namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub path: String,
    /// Previous path, for renames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub at: SystemTime,
}

impl ChangeEvent {
    pub fn new(kind: EventKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
            at: SystemTime::now(),
        }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Rename,
            path: to.into(),
            old_path: Some(from.into()),
            at: SystemTime::now(),
        }
    }
}

struct Subscriber {
    id: u64,
    prefix: String,
    mask: EventMask,
    tx: mpsc::Sender<ChangeEvent>,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl HubInner {
    fn remove(&self, id: u64) {
        self.subscribers.write().retain(|s| s.id != id);
    }
}

/// Publish/subscribe broker for change events.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events under `prefix` whose kind is in `mask`.
    pub fn watch(&self, prefix: &str, mask: EventMask) -> Watch {
        self.watch_with_capacity(prefix, mask, DEFAULT_CAPACITY)
    }

    /// Subscribe with an explicit mailbox size.
    pub fn watch_with_capacity(&self, prefix: &str, mask: EventMask, capacity: usize) -> Watch {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().push(Subscriber {
            id,
            prefix: path::normalize(prefix),
            mask,
            tx,
        });
        Watch {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Offer `event` to every matching subscriber without blocking.
    pub fn emit(&self, event: ChangeEvent) {
        let subscribers = self.inner.subscribers.read();
        for sub in subscribers.iter() {
            if !sub.mask.intersects(event.kind.mask()) || !path::has_prefix(&event.path, &sub.prefix) {
                continue;
            }
            if let Err(e) = sub.tx.try_send(event.clone()) {
                trace!(subscriber = sub.id, path = %event.path, error = %e, "event dropped");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

/// A live subscription. Closing or dropping it unregisters the subscriber.
pub struct Watch {
    id: u64,
    rx: mpsc::Receiver<ChangeEvent>,
    hub: Weak<HubInner>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch").field("id", &self.id).finish()
    }
}

impl Watch {
    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Take an event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn close(self) {}
}

impl Drop for Watch {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
