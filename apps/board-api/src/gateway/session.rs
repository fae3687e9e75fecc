//! Per-connection gateway session state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use board_common::id::{prefix, split_prefixed};
use board_common::PrefixedId;
use chrono::{DateTime, Utc};

use super::registry::ConnectionHandle;

/// Unique identifier of one transport session (`conn_` prefixed ULID).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(<Self as PrefixedId>::generate())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// When the connection was opened, read back from the ULID timestamp.
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        let (_, ulid) = split_prefixed(&self.0)?;
        DateTime::from_timestamp_millis(i64::try_from(ulid.timestamp_ms()).ok()?)
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixedId for ConnectionId {
    const PREFIX: &'static str = prefix::CONNECTION;
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State for a single admitted WebSocket connection.
pub struct GatewaySession {
    /// Identity from the verified credential. `None` means the connection
    /// is open but not a push target.
    pub user_id: Option<String>,
    handle: ConnectionHandle,
    /// Monotonically increasing sequence number for dispatch events.
    seq: AtomicU64,
}

impl GatewaySession {
    pub fn new(user_id: Option<String>, handle: ConnectionHandle) -> Self {
        Self {
            user_id,
            handle,
            seq: AtomicU64::new(0),
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Get the next sequence number for a dispatch event.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_records_open_time() {
        let before = Utc::now() - chrono::Duration::milliseconds(1);
        let id = ConnectionId::new();
        assert!(id.as_str().starts_with("conn_"));
        assert!(id.opened_at().unwrap() >= before);
    }

    #[test]
    fn sequence_starts_at_one() {
        let (handle, _rx) = ConnectionHandle::channel();
        let session = GatewaySession::new(Some("usr_1".to_string()), handle);
        assert_eq!(session.next_seq(), 1);
        assert_eq!(session.next_seq(), 2);
    }
}
