//! The Helper-side half of the request/response dance (spec §4.4
//! "Tool-call path"), shared verbatim between daemon mode and
//! direct-fallback mode: both ultimately reduce to "write a REQUEST onto
//! an outbound channel, wait on a correlation-table oneshot for the
//! matching RESPONSE." Only how the outbound channel is wired up (a
//! daemon socket vs. a directly-accepted extension WS) differs, which is
//! [`super::daemon_link`] and [`super::direct_link`]'s job.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bridge_core::{CorrelationOutcome, CorrelationTable};
use bridge_protocol::{Action, Message};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// Either "daemon" or "direct" (spec §4.4 step 5, S6's `mode` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Daemon,
	Direct,
}

impl Mode {
	pub fn as_str(self) -> &'static str {
		match self {
			Mode::Daemon => "daemon",
			Mode::Direct => "direct",
		}
	}
}

/// Shared plumbing used by both transports: the outbound message
/// channel, the correlation table keyed by `reqId`, a monotonic
/// per-helper request counter (spec §4.4: `${sessionId}:${counter}`),
/// and a slot for the one outstanding STATUS query (STATUS_OK carries no
/// `reqId`, so it cannot go through the correlation table).
pub struct RouterLink {
	pub mode: Mode,
	pub session_id: Option<String>,
	outbound: mpsc::UnboundedSender<Message>,
	correlation: Arc<CorrelationTable>,
	counter: AtomicU64,
	deadline: Duration,
	pending_status: Mutex<Option<oneshot::Sender<(bool, usize)>>>,
}

impl RouterLink {
	pub fn new(mode: Mode, session_id: Option<String>, outbound: mpsc::UnboundedSender<Message>, deadline: Duration) -> Self {
		Self {
			mode,
			session_id,
			outbound,
			correlation: CorrelationTable::new(),
			counter: AtomicU64::new(0),
			deadline,
			pending_status: Mutex::new(None),
		}
	}

	pub fn correlation(&self) -> &Arc<CorrelationTable> {
		&self.correlation
	}

	/// Allocates the next `reqId` for this helper: `${sessionId}:${counter}`
	/// in daemon mode, or a bare counter in direct mode where there is no
	/// session id to namespace with (spec §4.4, §9 open question iii).
	fn next_req_id(&self) -> String {
		let n = self.counter.fetch_add(1, Ordering::Relaxed);
		match &self.session_id {
			Some(session_id) => format!("{session_id}:{n}"),
			None => format!("direct:{n}"),
		}
	}

	pub async fn call(&self, action: Action, params: Value, tab_id: Option<String>) -> Result<Value, String> {
		let req_id = self.next_req_id();
		let rx = self.correlation.register(req_id.clone(), self.deadline);

		let request = Message::Request { req_id: req_id.clone(), session_id: self.session_id.clone(), action, params, tab_id };
		if self.outbound.send(request).is_err() {
			self.correlation.complete(&req_id, CorrelationOutcome::Err("extension not connected".to_string()));
		}

		match rx.await {
			Ok(CorrelationOutcome::Ok(data)) => Ok(data),
			Ok(CorrelationOutcome::Err(message)) => Err(message),
			Err(_) => Err("request aborted".to_string()),
		}
	}

	/// Queries STATUS. In daemon mode this round-trips to the daemon; in
	/// direct mode the caller short-circuits before ever reaching here
	/// (there is no daemon to ask, so the status is computed locally).
	pub async fn status(&self) -> Result<(bool, usize), String> {
		let (tx, rx) = oneshot::channel();
		*self.pending_status.lock() = Some(tx);
		if self.outbound.send(Message::Status).is_err() {
			return Err("daemon not connected".to_string());
		}
		rx.await.map_err(|_| "daemon connection closed".to_string())
	}

	/// Called by the transport's reader loop when a STATUS_OK arrives.
	pub fn resolve_status(&self, extension_connected: bool, active_sessions: usize) {
		if let Some(tx) = self.pending_status.lock().take() {
			let _ = tx.send((extension_connected, active_sessions));
		}
	}

	pub fn send_disconnect(&self) {
		if let Some(session_id) = &self.session_id {
			let _ = self.outbound.send(Message::Disconnect { session_id: session_id.clone() });
		}
	}

	pub fn abort_pending(&self, reason: &str) {
		self.correlation.abort_all(reason);
	}
}
