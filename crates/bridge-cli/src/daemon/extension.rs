//! Daemon <-> Extension WebSocket uplink (spec §4.3 "Extension-uplink
//! loss", §6 "Daemon <-> Extension (WebSocket)"). Adapted from the
//! original CDP relay's single-extension-socket design
//! (`handle_extension_socket`/`send_to_clients` in the old `relay.rs`),
//! carrying REQUEST/RESPONSE/SESSION_START/SESSION_END instead of raw
//! CDP passthrough.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use bridge_protocol::Message;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::state::DaemonState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<DaemonState>>) -> impl IntoResponse {
	ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<DaemonState>) {
	info!(target = "bridge.daemon", "extension connected");

	let (tx, rx) = mpsc::unbounded_channel::<Message>();
	state.set_extension(tx.clone());

	let (mut ws_tx, mut ws_rx) = socket.split();
	let mut outbound = UnboundedReceiverStream::new(rx);

	let send_task = tokio::spawn(async move {
		while let Some(message) = outbound.next().await {
			let text = match serde_json::to_string(&message) {
				Ok(text) => text,
				Err(err) => {
					warn!(target = "bridge.daemon", error = %err, "failed to encode message for extension");
					continue;
				}
			};
			if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
				break;
			}
		}
	});

	while let Some(frame) = ws_rx.next().await {
		match frame {
			Ok(WsMessage::Text(text)) => handle_inbound(&text, &state),
			Ok(WsMessage::Close(_)) => break,
			Ok(_) => {}
			Err(err) => {
				warn!(target = "bridge.daemon", error = %err, "extension websocket error");
				break;
			}
		}
	}

	state.clear_extension_if_current(&tx);
	state.correlation.abort_all("extension disconnected");
	send_task.abort();
	info!(target = "bridge.daemon", "extension disconnected");
}

fn handle_inbound(text: &str, state: &Arc<DaemonState>) {
	let message: Message = match serde_json::from_str(text) {
		Ok(message) => message,
		Err(err) => {
			warn!(target = "bridge.daemon", error = %err, "malformed frame from extension, dropping");
			return;
		}
	};

	match message {
		Message::Response { req_id, session_id, ok, data, error } => {
			if let Some(sid) = &session_id {
				state.sessions.touch(sid);
			}
			let outcome = if ok {
				bridge_core::CorrelationOutcome::Ok(data.unwrap_or(serde_json::Value::Null))
			} else {
				bridge_core::CorrelationOutcome::Err(error.unwrap_or_else(|| "unknown error".to_string()))
			};
			if !state.correlation.complete(&req_id, outcome) {
				debug!(target = "bridge.daemon", req_id = %req_id, "response for unknown or already-resolved reqId, dropping");
			}
		}
		other => {
			warn!(target = "bridge.daemon", kind = ?other, "unexpected message from extension, ignoring");
		}
	}
}
