//! Direct-mode fallback (startup algorithm step 5, open question iii):
//! when the daemon cannot be reached or spawned, the Helper itself opens
//! the local WebSocket listener the daemon would have bound and accepts
//! the extension's connection directly, playing the daemon's role for
//! exactly one session. Adapted from `daemon::extension`'s single-uplink
//! handling; a second connection attempt is refused rather than silently
//! replacing the first, since nothing here multiplexes sessions the way
//! the real daemon does.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use bridge_protocol::Message;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use super::link::{Mode, RouterLink};

/// The direct-mode link plus a liveness flag `browser_get_connection_status`
/// reads locally: there is no daemon to ask, direct mode already knows.
pub struct DirectLink {
	pub link: Arc<RouterLink>,
	pub connected: watch::Receiver<bool>,
}

struct DirectState {
	link: Arc<RouterLink>,
	outbound_rx: SyncMutex<Option<mpsc::UnboundedReceiver<Message>>>,
	connected_tx: watch::Sender<bool>,
	accepted: AtomicBool,
}

pub async fn start(ws_host: &str, ws_port: u16, request_deadline: Duration) -> std::io::Result<DirectLink> {
	let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
	let link = Arc::new(RouterLink::new(Mode::Direct, None, outbound_tx, request_deadline));
	let (connected_tx, connected_rx) = watch::channel(false);

	let state = Arc::new(DirectState {
		link: Arc::clone(&link),
		outbound_rx: SyncMutex::new(Some(outbound_rx)),
		connected_tx,
		accepted: AtomicBool::new(false),
	});

	let app = Router::new().route("/extension", get(upgrade)).with_state(state);
	let addr: SocketAddr = format!("{ws_host}:{ws_port}").parse().map_err(std::io::Error::other)?;
	let listener = TcpListener::bind(addr).await?;
	info!(target = "bridge.helper", %addr, "direct-mode extension listener bound");

	tokio::spawn(async move {
		let _ = axum::serve(listener, app.into_make_service()).await;
	});

	Ok(DirectLink { link, connected: connected_rx })
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<DirectState>>) -> impl IntoResponse {
	if state.accepted.swap(true, Ordering::SeqCst) {
		warn!(target = "bridge.helper", "refusing a second direct-mode extension connection");
		return axum::http::StatusCode::CONFLICT.into_response();
	}
	ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<DirectState>) {
	info!(target = "bridge.helper", "extension connected directly");

	let Some(outbound_rx) = state.outbound_rx.lock().unwrap().take() else {
		return;
	};
	let _ = state.connected_tx.send(true);

	let (mut ws_tx, mut ws_rx) = socket.split();
	let mut outbound = UnboundedReceiverStream::new(outbound_rx);

	let send_task = tokio::spawn(async move {
		while let Some(message) = outbound.next().await {
			let text = match serde_json::to_string(&message) {
				Ok(text) => text,
				Err(err) => {
					warn!(target = "bridge.helper", error = %err, "failed to encode message for extension");
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
			Ok(WsMessage::Text(text)) => handle_inbound(&text, &state.link),
			Ok(WsMessage::Close(_)) => break,
			Ok(_) => {}
			Err(err) => {
				warn!(target = "bridge.helper", error = %err, "direct-mode websocket error");
				break;
			}
		}
	}

	let _ = state.connected_tx.send(false);
	state.link.abort_pending("extension disconnected");
	send_task.abort();
	info!(target = "bridge.helper", "direct-mode extension disconnected");
}

fn handle_inbound(text: &str, link: &Arc<RouterLink>) {
	let message: Message = match serde_json::from_str(text) {
		Ok(message) => message,
		Err(err) => {
			warn!(target = "bridge.helper", error = %err, "malformed frame from extension, dropping");
			return;
		}
	};

	match message {
		Message::Response { req_id, ok, data, error, .. } => {
			let outcome = if ok {
				bridge_core::CorrelationOutcome::Ok(data.unwrap_or(serde_json::Value::Null))
			} else {
				bridge_core::CorrelationOutcome::Err(error.unwrap_or_else(|| "unknown error".to_string()))
			};
			link.correlation().complete(&req_id, outcome);
		}
		other => {
			warn!(target = "bridge.helper", kind = ?other, "unexpected message from extension, ignoring");
		}
	}
}
