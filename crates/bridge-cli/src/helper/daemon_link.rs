//! Daemon-mode connect path for the Helper: open the daemon's socket,
//! send REGISTER, await REGISTER_OK, then hand the connection off to a
//! steady-state reader/writer pair driving the shared [`super::link::RouterLink`].
//! Mirrors `daemon::connection` from the client's side of the same wire.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bridge_core::{CorrelationOutcome, FramedLineReader};
use bridge_protocol::{Message, codec};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::link::{Mode, RouterLink};

#[cfg(unix)]
type DaemonStream = tokio::net::UnixStream;
#[cfg(windows)]
type DaemonStream = tokio::net::TcpStream;

#[cfg(unix)]
async fn connect(socket_path: &Path) -> std::io::Result<DaemonStream> {
	tokio::net::UnixStream::connect(socket_path).await
}

#[cfg(windows)]
async fn connect(_socket_path: &Path) -> std::io::Result<DaemonStream> {
	use bridge_core::config::WINDOWS_FALLBACK_PORT;
	tokio::net::TcpStream::connect(("127.0.0.1", WINDOWS_FALLBACK_PORT)).await
}

/// Startup algorithm step 4: connect, send REGISTER, await REGISTER_OK.
/// Returns `None` on any failure along the way — refused connect, a
/// REGISTER_ERROR, or the socket closing mid-handshake — which the caller
/// treats identically: fall back to direct mode.
pub async fn try_connect(socket_path: &Path, request_deadline: Duration) -> Option<Arc<RouterLink>> {
	let stream = connect(socket_path).await.ok()?;
	let (read_half, mut write_half) = tokio::io::split(stream);
	let mut reader = FramedLineReader::new(read_half);

	write_half.write_all(&codec::encode_line(&Message::Register).ok()?).await.ok()?;

	let session_id = loop {
		let line = reader.next_line().await.ok()??;
		match codec::decode_line::<Message>(&line) {
			Ok(Message::RegisterOk { session_id }) => break session_id,
			Ok(Message::RegisterError { message }) => {
				warn!(target = "bridge.helper", error = %message, "daemon refused registration");
				return None;
			}
			Ok(_) => continue,
			Err(err) => {
				warn!(target = "bridge.helper", error = %err, "malformed frame during daemon handshake, ignoring");
				continue;
			}
		}
	};

	info!(target = "bridge.helper", session_id = %session_id, "registered with daemon");

	let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
	let link = Arc::new(RouterLink::new(Mode::Daemon, Some(session_id), outbound_tx, request_deadline));

	tokio::spawn(run_writer(write_half, outbound_rx));
	tokio::spawn(run_reader(reader, Arc::clone(&link)));

	Some(link)
}

async fn run_writer(mut write_half: WriteHalf<DaemonStream>, mut rx: mpsc::UnboundedReceiver<Message>) {
	while let Some(message) = rx.recv().await {
		let bytes = match codec::encode_line(&message) {
			Ok(bytes) => bytes,
			Err(err) => {
				warn!(target = "bridge.helper", error = %err, "failed to encode outgoing message");
				continue;
			}
		};
		if write_half.write_all(&bytes).await.is_err() {
			break;
		}
	}
}

async fn run_reader(mut reader: FramedLineReader<ReadHalf<DaemonStream>>, link: Arc<RouterLink>) {
	loop {
		let line = match reader.next_line().await {
			Ok(Some(line)) => line,
			Ok(None) => break,
			Err(err) => {
				warn!(target = "bridge.helper", error = %err, "daemon connection read error");
				break;
			}
		};

		let message: Message = match codec::decode_line(&line) {
			Ok(message) => message,
			Err(err) => {
				warn!(target = "bridge.helper", error = %err, "malformed frame from daemon, dropping line");
				continue;
			}
		};

		match message {
			Message::Response { req_id, ok, data, error, .. } => {
				let outcome = if ok {
					CorrelationOutcome::Ok(data.unwrap_or(serde_json::Value::Null))
				} else {
					CorrelationOutcome::Err(error.unwrap_or_else(|| "unknown error".to_string()))
				};
				link.correlation().complete(&req_id, outcome);
			}
			Message::StatusOk { extension_connected, active_sessions } => link.resolve_status(extension_connected, active_sessions),
			Message::Pong => {}
			other => {
				warn!(target = "bridge.helper", kind = ?other, "unexpected message from daemon, ignoring");
			}
		}
	}

	warn!(target = "bridge.helper", "daemon connection closed");
	link.abort_pending("daemon connection lost");
}
