//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time;

use crate::auth::credentials::{AdmissionError, Claims};
use crate::AppState;

use super::events::{ClientFrame, ClientMessage, GatewayMessage};
use super::registry::OutboundEvent;
use super::session::GatewaySession;

/// Close codes (4000-range for application-level).
pub const CLOSE_UNKNOWN_ERROR: u16 = 4000;
pub const CLOSE_UNKNOWN_OPCODE: u16 = 4001;
pub const CLOSE_NOT_AUTHENTICATED: u16 = 4003;
pub const CLOSE_SESSION_EXPIRED: u16 = 4009;
pub const CLOSE_HEARTBEAT_TIMEOUT: u16 = 4010;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

/// Admission is decided from the handshake headers before the upgrade
/// completes; a refused connection is closed without touching the registry.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let admission = state.credentials.admit(&headers);
    ws.on_upgrade(move |socket| async move {
        match admission {
            Ok(claims) => handle_connection(socket, state, claims).await,
            Err(reason) => reject(socket, reason).await,
        }
    })
}

async fn reject(socket: WebSocket, reason: AdmissionError) {
    tracing::debug!(%reason, "gateway admission refused");
    let code = match reason {
        AdmissionError::MustSignIn => CLOSE_NOT_AUTHENTICATED,
        AdmissionError::SessionExpired => CLOSE_SESSION_EXPIRED,
    };
    let (mut ws_tx, _ws_rx) = socket.split();
    let _ = send_close(&mut ws_tx, code, &reason.to_string()).await;
}

async fn handle_connection(socket: WebSocket, state: AppState, claims: Claims) {
    let gateway = state.gateway.clone();
    let (session, outbound_rx) = gateway.open_session(claims);
    let registered = gateway.on_connect(&session);

    tracing::info!(
        connection_id = %session.connection_id(),
        user_id = session.user_id.as_deref().unwrap_or("-"),
        registered,
        "gateway connection established"
    );

    let session = Arc::new(session);
    let (mut ws_tx, ws_rx) = socket.split();

    let ready = GatewayMessage::ready(
        session.next_seq(),
        session.connection_id(),
        session.user_id.as_deref(),
        state.config.heartbeat_interval_ms,
    );

    if send_message(&mut ws_tx, &ready).await.is_ok() {
        run_session(
            session.clone(),
            ws_tx,
            ws_rx,
            outbound_rx,
            state.config.heartbeat_interval_ms,
        )
        .await;
    }

    gateway.on_disconnect(&session);

    tracing::info!(
        connection_id = %session.connection_id(),
        user_id = session.user_id.as_deref().unwrap_or("-"),
        connected_secs = session
            .connection_id()
            .opened_at()
            .map(|at| (chrono::Utc::now() - at).num_seconds()),
        "gateway connection closed"
    );
}

/// Main session event loop: read client messages, forward pushes, enforce heartbeat.
async fn run_session(
    session: Arc<GatewaySession>,
    mut ws_tx: WsSink,
    mut ws_rx: WsStream,
    mut outbound_rx: mpsc::Receiver<Arc<OutboundEvent>>,
    heartbeat_interval_ms: u64,
) {
    // Every window of 1.5x the interval, starting at READY, must contain a heartbeat.
    let heartbeat_deadline = Duration::from_millis(heartbeat_interval_ms * 3 / 2);
    let mut heartbeat_timer = time::interval(heartbeat_deadline);
    heartbeat_timer.tick().await; // First tick fires immediately; skip it.
    let mut got_heartbeat = false;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg: ClientMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                                break;
                            }
                        };

                        match client_msg.decode() {
                            ClientFrame::Heartbeat { seq } => {
                                got_heartbeat = true;
                                let ack = GatewayMessage::heartbeat_ack(seq);
                                if send_message(&mut ws_tx, &ack).await.is_err() {
                                    break;
                                }
                            }
                            ClientFrame::Unknown(op) => {
                                tracing::debug!(op, connection_id = %session.connection_id(), "unknown client opcode");
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_OPCODE, "Unknown opcode").await;
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %session.connection_id(), "ws read error");
                        break;
                    }
                    Some(Ok(_)) => continue,
                }
            }

            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                let msg = GatewayMessage::push(session.next_seq(), &event);
                if send_message(&mut ws_tx, &msg).await.is_err() {
                    break;
                }
            }

            _ = heartbeat_timer.tick() => {
                if !got_heartbeat {
                    tracing::debug!(
                        connection_id = %session.connection_id(),
                        "heartbeat timeout, closing connection"
                    );
                    let _ = send_close(&mut ws_tx, CLOSE_HEARTBEAT_TIMEOUT, "Heartbeat timeout").await;
                    break;
                }
                got_heartbeat = false;
            }
        }
    }
}

async fn send_message(ws_tx: &mut WsSink, msg: &GatewayMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
