//! Frames exchanged on the presence socket.
//!
//! Server frames are `{op, t?, s?, d}`. The only client frame the gateway
//! understands is a heartbeat; anything else closes the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::OutboundEvent;
use super::session::ConnectionId;

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_HEARTBEAT_ACK: u8 = 6;

/// Dispatch names sent in `t`.
pub struct EventName;

impl EventName {
    pub const READY: &'static str = "READY";
    pub const NOTIFICATION: &'static str = "NOTIFICATION";
}

/// Frame written to the socket.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    pub d: Value,
}

/// Body of the `READY` dispatch.
#[derive(Debug, Serialize)]
pub struct ReadyPayload<'a> {
    pub connection_id: &'a str,
    /// `null` for sessions admitted without an identity.
    pub user_id: Option<&'a str>,
    pub heartbeat_interval: u64,
}

impl GatewayMessage {
    fn dispatch(event_name: &str, seq: u64, data: Value) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(event_name.to_string()),
            s: Some(seq),
            d: data,
        }
    }

    pub fn ready(
        seq: u64,
        connection_id: &ConnectionId,
        user_id: Option<&str>,
        heartbeat_interval: u64,
    ) -> Self {
        let payload = ReadyPayload {
            connection_id: connection_id.as_str(),
            user_id,
            heartbeat_interval,
        };
        Self::dispatch(
            EventName::READY,
            seq,
            serde_json::to_value(payload).unwrap_or(Value::Null),
        )
    }

    /// A queued push rendered as a dispatch.
    pub fn push(seq: u64, event: &OutboundEvent) -> Self {
        Self::dispatch(&event.event_name, seq, event.data.clone())
    }

    pub fn heartbeat_ack(seq: u64) -> Self {
        Self {
            op: OP_HEARTBEAT_ACK,
            t: None,
            s: None,
            d: serde_json::json!({ "ack": seq }),
        }
    }
}

/// Frame read from the socket.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

/// Decoded client frame.
#[derive(Debug, PartialEq, Eq)]
pub enum ClientFrame {
    /// Heartbeat echoing the last sequence number the client saw.
    Heartbeat { seq: u64 },
    Unknown(u8),
}

#[derive(Debug, Default, Deserialize)]
struct HeartbeatPayload {
    #[serde(default)]
    seq: u64,
}

impl ClientMessage {
    pub fn decode(self) -> ClientFrame {
        match self.op {
            OP_HEARTBEAT => {
                let payload: HeartbeatPayload = serde_json::from_value(self.d).unwrap_or_default();
                ClientFrame::Heartbeat { seq: payload.seq }
            }
            other => ClientFrame::Unknown(other),
        }
    }
}
