//! Correlation Table (spec §4.2, C2): "Exposes `register`, `complete`,
//! `abortAll`, and `has`. Each entry holds one timer that, on fire,
//! removes the entry and rejects with a 'timeout' error. Completing an
//! entry clears its timer."
//!
//! Rust idiom substitutes the spec's resolve/reject callback pair with a
//! `oneshot::Receiver<CorrelationOutcome>` the caller awaits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

/// The eventual outcome of one pending request.
#[derive(Debug, Clone)]
pub enum CorrelationOutcome {
	Ok(Value),
	Err(String),
}

struct Entry {
	tx: oneshot::Sender<CorrelationOutcome>,
	timer: tokio::task::JoinHandle<()>,
}

/// Owned by the daemon's event loop only (spec §5 "Shared-resource
/// policy"); callers are expected to hold it behind an `Arc` so the
/// per-entry timeout task can reach back in to fire the deadline.
#[derive(Default)]
pub struct CorrelationTable {
	entries: Mutex<HashMap<String, Entry>>,
}

impl CorrelationTable {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Register a pending request. A `reqId` collision is a programmer
	/// error: it fails fatally in debug builds (`debug_assert!`) and, per
	/// spec §4.2 edge cases, "rejects the new entry immediately" in release.
	pub fn register(self: &Arc<Self>, req_id: impl Into<String>, deadline: Duration) -> oneshot::Receiver<CorrelationOutcome> {
		let req_id = req_id.into();
		let (tx, rx) = oneshot::channel();

		let mut guard = self.entries.lock();
		if guard.contains_key(&req_id) {
			debug_assert!(false, "reqId collision: {req_id}");
			let _ = tx.send(CorrelationOutcome::Err("duplicate reqId".to_string()));
			return rx;
		}

		let table = Arc::clone(self);
		let timeout_key = req_id.clone();
		let timer = tokio::spawn(async move {
			tokio::time::sleep(deadline).await;
			table.fire_timeout(&timeout_key);
		});

		guard.insert(req_id, Entry { tx, timer });
		rx
	}

	fn fire_timeout(&self, req_id: &str) {
		let mut guard = self.entries.lock();
		if let Some(entry) = guard.remove(req_id) {
			let _ = entry.tx.send(CorrelationOutcome::Err("timeout".to_string()));
		}
	}

	/// Complete a pending entry. Returns `false` (and does nothing) if no
	/// entry is registered under `req_id` — spec §8: "A REQUEST arriving
	/// after its deadline: response (if any) silently discarded."
	pub fn complete(&self, req_id: &str, outcome: CorrelationOutcome) -> bool {
		let mut guard = self.entries.lock();
		match guard.remove(req_id) {
			Some(entry) => {
				entry.timer.abort();
				let _ = entry.tx.send(outcome);
				true
			}
			None => false,
		}
	}

	pub fn has(&self, req_id: &str) -> bool {
		self.entries.lock().contains_key(req_id)
	}

	/// Reject every pending entry with `reason` and empty the table.
	/// Used on extension-uplink loss (spec §4.3): "abort every pending
	/// entry (they can never complete)".
	pub fn abort_all(&self, reason: &str) {
		let mut guard = self.entries.lock();
		for (_, entry) in guard.drain() {
			entry.timer.abort();
			let _ = entry.tx.send(CorrelationOutcome::Err(reason.to_string()));
		}
	}

	/// Reject every pending entry belonging to `session_id`, relying on
	/// the `${sessionId}:${counter}` reqId scheme (spec §4.4). Used on
	/// session termination (spec §4.3).
	pub fn abort_session(&self, session_id: &str, reason: &str) {
		let prefix = format!("{session_id}:");
		let mut guard = self.entries.lock();
		let matching: Vec<String> = guard.keys().filter(|key| key.starts_with(&prefix)).cloned().collect();
		for key in matching {
			if let Some(entry) = guard.remove(&key) {
				entry.timer.abort();
				let _ = entry.tx.send(CorrelationOutcome::Err(reason.to_string()));
			}
		}
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn complete_resolves_the_waiter() {
		let table = CorrelationTable::new();
		let rx = table.register("s1:1", Duration::from_secs(30));
		assert!(table.has("s1:1"));

		table.complete("s1:1", CorrelationOutcome::Ok(serde_json::json!({"ok": true})));
		let outcome = rx.await.unwrap();
		assert!(matches!(outcome, CorrelationOutcome::Ok(_)));
		assert!(!table.has("s1:1"));
	}

	#[tokio::test]
	async fn complete_is_a_no_op_for_unknown_req_id() {
		let table = CorrelationTable::new();
		assert!(!table.complete("missing", CorrelationOutcome::Err("ignored".into())));
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_fires_timeout_and_clears_the_entry() {
		let table = CorrelationTable::new();
		let rx = table.register("s1:1", Duration::from_millis(50));

		tokio::time::advance(Duration::from_millis(60)).await;

		let outcome = rx.await.unwrap();
		assert!(matches!(outcome, CorrelationOutcome::Err(ref msg) if msg == "timeout"));
		assert!(!table.has("s1:1"));
	}

	#[tokio::test]
	async fn complete_clears_the_timer_so_it_never_fires_late() {
		let table = CorrelationTable::new();
		let rx = table.register("s1:1", Duration::from_millis(10));
		table.complete("s1:1", CorrelationOutcome::Ok(Value::Null));
		let outcome = rx.await.unwrap();
		assert!(matches!(outcome, CorrelationOutcome::Ok(_)));
	}

	#[tokio::test]
	async fn abort_all_rejects_every_entry_and_empties_the_table() {
		let table = CorrelationTable::new();
		let rx1 = table.register("s1:1", Duration::from_secs(30));
		let rx2 = table.register("s2:1", Duration::from_secs(30));

		table.abort_all("extension disconnected");

		assert!(table.is_empty());
		assert!(matches!(rx1.await.unwrap(), CorrelationOutcome::Err(ref m) if m == "extension disconnected"));
		assert!(matches!(rx2.await.unwrap(), CorrelationOutcome::Err(ref m) if m == "extension disconnected"));
	}

	#[tokio::test]
	async fn abort_session_only_touches_that_sessions_entries() {
		let table = CorrelationTable::new();
		let rx1 = table.register("s1:1", Duration::from_secs(30));
		let rx2 = table.register("s1:2", Duration::from_secs(30));
		let rx3 = table.register("s2:1", Duration::from_secs(30));

		table.abort_session("s1", "session ended");

		assert!(!table.has("s1:1"));
		assert!(!table.has("s1:2"));
		assert!(table.has("s2:1"));
		assert!(matches!(rx1.await.unwrap(), CorrelationOutcome::Err(_)));
		assert!(matches!(rx2.await.unwrap(), CorrelationOutcome::Err(_)));
		drop(rx3);
	}
}
