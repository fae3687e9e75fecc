//! Presence gateway: owns the connection registry and exposes push delivery.
//!
//! Notification services hold the gateway behind [`PushDelivery`] and call
//! `push_to` after persisting a notification. The socket push is only a
//! low-latency hint, so delivery is best-effort and at-most-once.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::auth::credentials::Claims;

use super::events::EventName;
use super::registry::{ConnectionHandle, ConnectionRegistry, DeliveryDropped, OutboundEvent};
use super::session::GatewaySession;

/// Payload handed to [`PushDelivery::push_to`].
#[derive(Debug, Clone)]
pub struct PushPayload {
    pub event_name: String,
    pub data: Value,
}

impl PushPayload {
    pub fn new(event_name: impl Into<String>, data: Value) -> Self {
        Self {
            event_name: event_name.into(),
            data,
        }
    }

    /// A `NOTIFICATION` dispatch.
    pub fn notification(data: Value) -> Self {
        Self::new(EventName::NOTIFICATION, data)
    }
}

/// Push contract consumed by notification senders.
pub trait PushDelivery: Send + Sync {
    /// Deliver `payload` to `user_id` if they are connected. Never blocks and
    /// never reports failure.
    fn push_to(&self, user_id: &str, payload: PushPayload);
}

/// Sole owner of the [`ConnectionRegistry`].
#[derive(Default)]
pub struct PresenceGateway {
    registry: ConnectionRegistry,
}

impl PresenceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the session for an admitted connection along with the receiver
    /// the connection task drains.
    pub fn open_session(
        &self,
        claims: Claims,
    ) -> (GatewaySession, mpsc::Receiver<Arc<OutboundEvent>>) {
        let (handle, rx) = ConnectionHandle::channel();
        (GatewaySession::new(claims.user_id, handle), rx)
    }

    /// Register the session for push delivery. Sessions without a user id
    /// stay unregistered. Returns whether an entry was written.
    pub fn on_connect(&self, session: &GatewaySession) -> bool {
        let Some(user_id) = session.user_id.as_deref() else {
            tracing::debug!(
                connection_id = %session.connection_id(),
                "anonymous connection, not registered for push"
            );
            return false;
        };

        if let Some(displaced) = self.registry.register(user_id, session.handle().clone()) {
            tracing::debug!(
                %user_id,
                connection_id = %session.connection_id(),
                displaced = %displaced,
                "newer connection replaced previous push target"
            );
        }
        true
    }

    /// Drop the registry entry that points at this session's handle, if any.
    pub fn on_disconnect(&self, session: &GatewaySession) {
        if let Some(user_id) = self.registry.remove_connection(session.connection_id()) {
            tracing::debug!(
                %user_id,
                connection_id = %session.connection_id(),
                "push target removed"
            );
        }
    }

    /// Number of users currently reachable for push.
    pub fn connected_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.registry.get(user_id).is_some()
    }
}

impl PushDelivery for PresenceGateway {
    fn push_to(&self, user_id: &str, payload: PushPayload) {
        let Some(handle) = self.registry.get(user_id) else {
            return;
        };

        let event = Arc::new(OutboundEvent {
            event_name: payload.event_name,
            data: payload.data,
        });

        match handle.try_deliver(event) {
            Ok(()) => {}
            Err(DeliveryDropped::QueueFull) => {
                tracing::debug!(%user_id, connection_id = %handle.id(), "outbound queue full, push dropped");
            }
            Err(DeliveryDropped::Closed) => {
                tracing::debug!(%user_id, connection_id = %handle.id(), "connection closing, push dropped");
            }
        }
    }
}
