//! Shared state for the Router Daemon (spec §4.3, C3): the three
//! singletons named in spec §9 ("the daemon's session table, the
//! daemon's pending table") plus the extension uplink handle, all owned
//! by the daemon's event loop and never read from outside it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bridge_core::{CorrelationTable, IdleTimer, SessionTable};
use bridge_protocol::Message;
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub struct DaemonState {
	pub sessions: SessionTable,
	pub correlation: Arc<CorrelationTable>,
	pub idle_timer: IdleTimer,
	pub max_sessions: usize,
	pub request_deadline: Duration,
	extension: Mutex<Option<mpsc::UnboundedSender<Message>>>,
	next_helper_id: AtomicU64,
}

impl DaemonState {
	pub fn new(max_sessions: usize, request_deadline: Duration, idle_shutdown: Duration) -> Arc<Self> {
		Arc::new(Self {
			sessions: SessionTable::new(),
			correlation: CorrelationTable::new(),
			idle_timer: IdleTimer::new(idle_shutdown),
			max_sessions,
			request_deadline,
			extension: Mutex::new(None),
			next_helper_id: AtomicU64::new(0),
		})
	}

	pub fn next_helper_id(&self) -> u64 {
		self.next_helper_id.fetch_add(1, Ordering::Relaxed)
	}

	pub fn extension_connected(&self) -> bool {
		self.extension.lock().is_some()
	}

	/// Installs a new extension uplink, replacing (and implicitly
	/// dropping) any previous one. A previous sender being replaced
	/// rather than explicitly closed is fine: its send side is simply
	/// abandoned, and the old WS handler task notices on its next send.
	pub fn set_extension(&self, tx: mpsc::UnboundedSender<Message>) {
		*self.extension.lock() = Some(tx);
	}

	/// Clears the extension uplink, but only if `expected` is still the
	/// installed sender — guards against a stale disconnect handler
	/// clobbering a newer reconnection (spec §4.3: "a reconnect is
	/// passive").
	pub fn clear_extension_if_current(&self, expected: &mpsc::UnboundedSender<Message>) {
		let mut guard = self.extension.lock();
		if let Some(current) = guard.as_ref() {
			if current.same_channel(expected) {
				*guard = None;
			}
		}
	}

	pub fn take_extension(&self) -> Option<mpsc::UnboundedSender<Message>> {
		self.extension.lock().take()
	}

	/// Forward a message to the extension. Fails with
	/// `ExtensionNotConnected` if no uplink is installed or the uplink's
	/// receiver has gone away.
	pub fn send_to_extension(&self, message: Message) -> bridge_core::Result<()> {
		let tx = self.extension.lock().clone();
		match tx {
			Some(tx) => tx.send(message).map_err(|_| bridge_core::RouterError::ExtensionNotConnected),
			None => Err(bridge_core::RouterError::ExtensionNotConnected),
		}
	}

	/// Session termination (spec §4.3): removes the session, aborts its
	/// pending entries, and best-effort notifies the extension. Used by
	/// DISCONNECT, helper-connection close, and daemon shutdown.
	pub fn terminate_session(&self, session_id: &str) {
		if self.sessions.remove(session_id).is_none() {
			return;
		}
		self.correlation.abort_session(session_id, "session ended");
		let _ = self.send_to_extension(Message::SessionEnd { session_id: session_id.to_string() });
	}
}
