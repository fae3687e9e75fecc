//! Registry of push-reachable connections, keyed by user identity.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::session::ConnectionId;

/// Capacity of each connection's outbound queue. A push into a full queue is
/// dropped rather than waited on.
pub const OUTBOUND_CAPACITY: usize = 64;

/// An event queued for delivery on one connection.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    /// The dispatch event name (e.g. "NOTIFICATION").
    pub event_name: String,
    pub data: Value,
}

/// Why a push did not reach the outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryDropped {
    QueueFull,
    Closed,
}

/// Sender side of a connection: its identity plus its outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Arc<OutboundEvent>>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver the connection task drains.
    pub fn channel() -> (Self, mpsc::Receiver<Arc<OutboundEvent>>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let handle = Self {
            id: ConnectionId::new(),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Enqueue without waiting.
    pub fn try_deliver(&self, event: Arc<OutboundEvent>) -> Result<(), DeliveryDropped> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryDropped::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryDropped::Closed,
        })
    }
}

#[derive(Default)]
struct Inner {
    by_user: HashMap<String, ConnectionHandle>,
    /// Reverse index so teardown targets the exact handle that closed.
    by_connection: HashMap<ConnectionId, String>,
}

/// User → connection mapping. Both indexes sit behind one mutex so every
/// mutation and lookup is serialized.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `user_id` to `handle`, replacing any previous handle for that user.
    ///
    /// Returns the id of the displaced connection, if any.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) -> Option<ConnectionId> {
        let mut inner = self.inner.lock();
        let id = handle.id().clone();

        // A handle belongs to exactly one user.
        if let Some(previous_owner) = inner.by_connection.insert(id.clone(), user_id.to_string()) {
            if previous_owner != user_id {
                inner.by_user.remove(&previous_owner);
            }
        }

        let old = inner.by_user.insert(user_id.to_string(), handle)?;
        if old.id == id {
            return None;
        }
        inner.by_connection.remove(&old.id);
        Some(old.id)
    }

    /// Remove whatever entry points at `connection_id`.
    ///
    /// Returns the user the connection was registered for. A connection that
    /// was already displaced by a newer one is not found, and the newer entry
    /// is left untouched.
    pub fn remove_connection(&self, connection_id: &ConnectionId) -> Option<String> {
        let mut inner = self.inner.lock();
        let user_id = inner.by_connection.remove(connection_id)?;

        let is_current = inner
            .by_user
            .get(&user_id)
            .is_some_and(|h| h.id() == connection_id);
        if is_current {
            inner.by_user.remove(&user_id);
        }

        Some(user_id)
    }

    /// Current handle for a user.
    pub fn get(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.inner.lock().by_user.get(user_id).cloned()
    }

    #[cfg(test)]
    fn contains_connection(&self, connection_id: &ConnectionId) -> bool {
        self.inner.lock().by_connection.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
