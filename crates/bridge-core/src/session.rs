//! Session table (spec §3 "Session", §4.3 Router Daemon) and the
//! idle-auto-shutdown arming policy (spec §4.3 "Auto-shutdown").
//!
//! Owned exclusively by the daemon's event loop (spec §5
//! "Shared-resource policy"): "no other actor reads them."

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::RngCore;
use tokio::time::{Duration, Instant};

/// One row of the session table. `helper_id` is an opaque handle chosen
/// by the daemon's connection layer (e.g. a per-connection counter); the
/// session table itself does not interpret it.
#[derive(Debug, Clone)]
pub struct SessionRecord {
	pub session_id: String,
	pub helper_id: u64,
	pub created_at: Instant,
	pub last_active_at: Instant,
}

#[derive(Default)]
pub struct SessionTable {
	sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// REGISTER (spec §4.3): "allocate a fresh sessionId (random,
	/// unguessable, collision-free within process lifetime)". Returns
	/// `None` if the table is already at `max_sessions` (spec §8 boundary:
	/// "Sessions at MAX_SESSIONS exactly: accepted. The next REGISTER
	/// yields REGISTER_ERROR.").
	pub fn register(&self, helper_id: u64, max_sessions: usize) -> Option<SessionRecord> {
		let mut guard = self.sessions.lock();
		if guard.len() >= max_sessions {
			return None;
		}

		let session_id = loop {
			let candidate = generate_session_id();
			if !guard.contains_key(&candidate) {
				break candidate;
			}
		};

		let now = Instant::now();
		let record = SessionRecord {
			session_id: session_id.clone(),
			helper_id,
			created_at: now,
			last_active_at: now,
		};
		guard.insert(session_id, record.clone());
		Some(record)
	}

	pub fn contains(&self, session_id: &str) -> bool {
		self.sessions.lock().contains_key(session_id)
	}

	pub fn touch(&self, session_id: &str) -> bool {
		let mut guard = self.sessions.lock();
		match guard.get_mut(session_id) {
			Some(record) => {
				record.last_active_at = Instant::now();
				true
			}
			None => false,
		}
	}

	/// Session termination (spec §4.3): removes the session; the caller
	/// is responsible for aborting its pending entries and notifying the
	/// extension with SESSION_END.
	pub fn remove(&self, session_id: &str) -> Option<SessionRecord> {
		self.sessions.lock().remove(session_id)
	}

	/// All sessions owned by a given helper connection, for cleanup on
	/// helper-connection close (spec §3: "destroyed on helper disconnect").
	pub fn remove_by_helper(&self, helper_id: u64) -> Vec<SessionRecord> {
		let mut guard = self.sessions.lock();
		let dead: Vec<String> = guard.values().filter(|record| record.helper_id == helper_id).map(|record| record.session_id.clone()).collect();
		dead.into_iter().filter_map(|id| guard.remove(&id)).collect()
	}

	pub fn len(&self) -> usize {
		self.sessions.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn snapshot(&self) -> Vec<SessionRecord> {
		self.sessions.lock().values().cloned().collect()
	}
}

fn generate_session_id() -> String {
	let mut bytes = [0u8; 16];
	rand::thread_rng().fill_bytes(&mut bytes);
	let mut hex = String::with_capacity(32 + 5);
	hex.push_str("sess_");
	for byte in bytes {
		hex.push_str(&format!("{byte:02x}"));
	}
	hex
}

/// Arming policy for the daemon's idle-shutdown timer (spec §4.3): "An
/// idle timer (e.g. 60 s) fires whenever the active-session count drops
/// to zero; if still zero on fire, the daemon ... exits."
///
/// This only tracks *when the timer should be considered armed and
/// expired*; the daemon's event loop owns the actual `sleep` future and
/// the shutdown sequence (spec §5 shutdown ordering).
pub struct IdleTimer {
	deadline: Duration,
	armed_since: Mutex<Option<Instant>>,
}

impl IdleTimer {
	pub fn new(deadline: Duration) -> Self {
		Self { deadline, armed_since: Mutex::new(None) }
	}

	/// Call once per event-loop tick with the current session count.
	pub fn observe(&self, active_sessions: usize) {
		let mut guard = self.armed_since.lock();
		if active_sessions == 0 {
			guard.get_or_insert_with(Instant::now);
		} else {
			*guard = None;
		}
	}

	/// True once the table has been continuously empty for `deadline`.
	pub fn expired(&self) -> bool {
		match *self.armed_since.lock() {
			Some(armed_at) => armed_at.elapsed() >= self.deadline,
			None => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn register_allocates_unique_unguessable_ids() {
		let table = SessionTable::new();
		let a = table.register(1, 100).unwrap();
		let b = table.register(2, 100).unwrap();
		assert_ne!(a.session_id, b.session_id);
		assert!(a.session_id.starts_with("sess_"));
	}

	#[test]
	fn register_refuses_past_max_sessions() {
		let table = SessionTable::new();
		for i in 0..3 {
			assert!(table.register(i, 3).is_some());
		}
		assert!(table.register(99, 3).is_none());
	}

	#[test]
	fn remove_by_helper_clears_only_that_helpers_sessions() {
		let table = SessionTable::new();
		table.register(1, 100).unwrap();
		table.register(1, 100).unwrap();
		table.register(2, 100).unwrap();

		let removed = table.remove_by_helper(1);
		assert_eq!(removed.len(), 2);
		assert_eq!(table.len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn idle_timer_expires_only_after_continuous_emptiness() {
		let timer = IdleTimer::new(Duration::from_secs(60));
		timer.observe(0);
		assert!(!timer.expired());

		tokio::time::advance(Duration::from_secs(30)).await;
		timer.observe(1); // a session registered mid-wait
		assert!(!timer.expired());

		timer.observe(0); // re-armed from scratch
		tokio::time::advance(Duration::from_secs(59)).await;
		assert!(!timer.expired());

		tokio::time::advance(Duration::from_secs(2)).await;
		assert!(timer.expired());
	}
}
