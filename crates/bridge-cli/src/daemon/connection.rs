//! One helper connection (spec §4.3 external surface): reads REGISTER /
//! REQUEST / PING / STATUS / DISCONNECT off the socket and writes back
//! REGISTER_OK/ERROR, RESPONSE, PONG, STATUS_OK. Each REQUEST is handled
//! on its own task so a slow in-flight request never blocks this
//! connection from reading the helper's next message (spec §5: "the
//! router treats concurrent in-flight requests from one session as
//! independent").

use std::sync::Arc;

use bridge_core::{CorrelationOutcome, FramedLineReader};
use bridge_protocol::{Message, codec};
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::state::DaemonState;
use super::transport::HelperStream;

pub async fn handle(stream: HelperStream, state: Arc<DaemonState>, helper_id: u64) {
	info!(target = "bridge.daemon", helper_id, "helper connection accepted");

	let (read_half, write_half) = tokio::io::split(stream);
	let (writer_tx, writer_rx) = mpsc::unbounded_channel::<Message>();

	let writer_task = tokio::spawn(run_writer(write_half, writer_rx));

	let mut current_session: Option<String> = None;
	let mut reader = FramedLineReader::new(read_half);

	loop {
		let line = match reader.next_line().await {
			Ok(Some(line)) => line,
			Ok(None) => break,
			Err(err) => {
				warn!(target = "bridge.daemon", helper_id, error = %err, "helper connection read error");
				break;
			}
		};

		let message: Message = match codec::decode_line(&line) {
			Ok(message) => message,
			Err(err) => {
				warn!(target = "bridge.daemon", helper_id, error = %err, "malformed frame from helper, dropping line");
				continue;
			}
		};

		handle_message(message, &state, helper_id, &mut current_session, &writer_tx);
	}

	if let Some(session_id) = current_session {
		state.terminate_session(&session_id);
	} else {
		for record in state.sessions.remove_by_helper(helper_id) {
			state.correlation.abort_session(&record.session_id, "session ended");
			let _ = state.send_to_extension(Message::SessionEnd { session_id: record.session_id });
		}
	}

	drop(writer_tx);
	let _ = writer_task.await;
	info!(target = "bridge.daemon", helper_id, "helper connection closed");
}

fn handle_message(message: Message, state: &Arc<DaemonState>, helper_id: u64, current_session: &mut Option<String>, writer_tx: &mpsc::UnboundedSender<Message>) {
	match message {
		Message::Register => {
			match state.sessions.register(helper_id, state.max_sessions) {
				Some(record) => {
					info!(target = "bridge.daemon", helper_id, session_id = %record.session_id, "session registered");
					*current_session = Some(record.session_id.clone());
					let _ = state.send_to_extension(Message::SessionStart { session_id: record.session_id.clone() });
					let _ = writer_tx.send(Message::RegisterOk { session_id: record.session_id });
				}
				None => {
					warn!(target = "bridge.daemon", helper_id, max = state.max_sessions, "session limit exceeded");
					let _ = writer_tx.send(Message::RegisterError { message: bridge_core::RouterError::SessionLimitExceeded(state.max_sessions).wire_message() });
				}
			}
		}

		Message::Request { req_id, session_id, action, params, tab_id } => {
			debug!(target = "bridge.daemon", req_id = %req_id, action = action.wire_name(), "request received");

			if let Some(sid) = &session_id {
				if !state.sessions.contains(sid) {
					let _ = writer_tx.send(Message::Response {
						req_id,
						session_id,
						ok: false,
						data: None,
						error: Some(bridge_core::RouterError::UnknownSession(sid.clone()).wire_message()),
					});
					return;
				}
			}

			if state.correlation.has(&req_id) {
				let _ = writer_tx.send(Message::Response {
					req_id: req_id.clone(),
					session_id,
					ok: false,
					data: None,
					error: Some(bridge_core::RouterError::UnknownReqId(req_id).wire_message()),
				});
				return;
			}

			if !state.extension_connected() {
				let _ = writer_tx.send(Message::Response {
					req_id,
					session_id,
					ok: false,
					data: None,
					error: Some(bridge_core::RouterError::ExtensionNotConnected.wire_message()),
				});
				return;
			}

			let rx = state.correlation.register(req_id.clone(), state.request_deadline);
			let forwarded = state.send_to_extension(Message::Request { req_id: req_id.clone(), session_id: session_id.clone(), action, params, tab_id });
			if let Err(err) = forwarded {
				state.correlation.complete(&req_id, CorrelationOutcome::Err(err.wire_message()));
			}

			let writer_tx = writer_tx.clone();
			tokio::spawn(async move {
				let response = match rx.await {
					Ok(CorrelationOutcome::Ok(data)) => Message::Response { req_id, session_id, ok: true, data: Some(data), error: None },
					Ok(CorrelationOutcome::Err(error)) => Message::Response { req_id, session_id, ok: false, data: None, error: Some(error) },
					Err(_) => Message::Response { req_id, session_id, ok: false, data: None, error: Some("request aborted".to_string()) },
				};
				let _ = writer_tx.send(response);
			});
		}

		Message::Ping => {
			if let Some(session_id) = current_session.as_deref() {
				state.sessions.touch(session_id);
			}
			let _ = writer_tx.send(Message::Pong);
		}

		Message::Status => {
			let _ = writer_tx.send(Message::StatusOk { extension_connected: state.extension_connected(), active_sessions: state.sessions.len() });
		}

		Message::Disconnect { session_id } => {
			info!(target = "bridge.daemon", session_id = %session_id, "session disconnected");
			state.terminate_session(&session_id);
			if current_session.as_deref() == Some(session_id.as_str()) {
				*current_session = None;
			}
		}

		other => {
			warn!(target = "bridge.daemon", helper_id, kind = ?other, "unexpected message from helper, ignoring");
		}
	}
}

async fn run_writer(mut write_half: WriteHalf<HelperStream>, mut rx: mpsc::UnboundedReceiver<Message>) {
	while let Some(message) = rx.recv().await {
		let bytes = match codec::encode_line(&message) {
			Ok(bytes) => bytes,
			Err(err) => {
				warn!(target = "bridge.daemon", error = %err, "failed to encode outgoing message");
				continue;
			}
		};
		if write_half.write_all(&bytes).await.is_err() {
			break;
		}
	}
}
