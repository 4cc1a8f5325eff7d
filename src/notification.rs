// src/notification.rs
//! Binding change notifications.
//! Subscribers receive events over unbounded channels; a dropped receiver is
//! pruned the next time an event is emitted.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub const NOTIF_TYPE_NEW_BINDING: &str = "naming.binding.added";
pub const NOTIF_TYPE_REMOVED_BINDING: &str = "naming.binding.removed";
pub const NOTIF_TYPE_RENAMED_BINDING: &str = "naming.binding.renamed";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    BindingAdded,
    BindingRemoved,
    BindingRenamed,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 3] = [
        NotificationKind::BindingAdded,
        NotificationKind::BindingRemoved,
        NotificationKind::BindingRenamed,
    ];

    /// Notification type string advertised in metadata.
    pub fn type_name(&self) -> &'static str {
        match self {
            NotificationKind::BindingAdded => NOTIF_TYPE_NEW_BINDING,
            NotificationKind::BindingRemoved => NOTIF_TYPE_REMOVED_BINDING,
            NotificationKind::BindingRenamed => NOTIF_TYPE_RENAMED_BINDING,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NotificationKind::BindingAdded => {
                "A notification emitted when a new name is bound to the context"
            }
            NotificationKind::BindingRemoved => {
                "A notification emitted when a bound name is removed from the context"
            }
            NotificationKind::BindingRenamed => "A notification emitted when a bound name is renamed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Per-context sequence number, starting at 1.
    pub sequence: u64,
    /// The affected name (the new name for renames).
    pub name: String,
    /// Previous name, only set for renames.
    pub old_name: Option<String>,
}

/// Fan-out of notifications to any number of subscribers.
pub struct NotificationHub {
    subscribers: Mutex<Vec<Sender<Notification>>>,
    sequence: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn emit(&self, kind: NotificationKind, name: &str, old_name: Option<&str>) {
        let mut subs = self.subscribers.lock();
        // sequence is taken under the lock so subscribers observe it in order
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        if subs.is_empty() {
            return;
        }
        let n = Notification {
            kind,
            sequence,
            name: name.to_string(),
            old_name: old_name.map(str::to_string),
        };
        subs.retain(|tx| tx.send(n.clone()).is_ok());
        tracing::trace!(kind = kind.type_name(), sequence, subscribers = subs.len(), "notification emitted");
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
