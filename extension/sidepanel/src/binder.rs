//! Session/Tab Binder (C6): the only module that knows what a "tab" is.
//! One binding per session; re-created lazily if the bound tab has
//! vanished; an explicit `tabId` always wins and updates the binding.

use std::collections::{HashMap, HashSet};

struct Binding {
	tab_id: i32,
	created_at: f64,
	last_active_at: f64,
}

#[derive(Default)]
pub struct Binder {
	bindings: HashMap<String, Binding>,
	locked: HashSet<String>,
}

/// Extension store hosts the debugger can attach to but must not: an
/// agent driving its own store listing can trigger install/uninstall
/// flows outside its sandbox.
const WEB_STORE_HOSTS: &[&str] = &["chromewebstore.google.com", "chrome.google.com/webstore"];

/// Tabs whose URL is not an ordinary `http(s)` page are not ones an
/// action can be run against; a resolver must create a fresh blank tab
/// instead of picking one. Web-store hosts are excluded even though
/// they're `https`. Exposed standalone (not a `Binder` method) so it
/// can be unit-tested directly.
pub fn is_scriptable_url(url: &str) -> bool {
	if !(url.starts_with("http://") || url.starts_with("https://")) {
		return false;
	}
	!WEB_STORE_HOSTS.iter().any(|host| url[url.find("://").map(|i| i + 3).unwrap_or(0)..].starts_with(host))
}

impl Binder {
	pub fn new() -> Self {
		Self::default()
	}

	/// The tab currently bound to `session_id`, if the binding still
	/// points at a tab we have not since forgotten. Callers still need
	/// to verify the tab actually exists, since re-creation is lazy and
	/// the binder itself has no tab-existence oracle.
	pub fn current(&self, session_id: &str) -> Option<i32> {
		self.bindings.get(session_id).map(|b| b.tab_id)
	}

	/// Creates or overwrites the binding for `session_id`, as happens on
	/// first request, on explicit `tabId` override, and on rebind after
	/// the home tab disappeared.
	pub fn bind(&mut self, session_id: &str, tab_id: i32, now: f64) {
		match self.bindings.get_mut(session_id) {
			Some(existing) => {
				existing.tab_id = tab_id;
				existing.last_active_at = now;
			}
			None => {
				self.bindings.insert(session_id.to_string(), Binding { tab_id, created_at: now, last_active_at: now });
			}
		}
	}

	pub fn touch(&mut self, session_id: &str, now: f64) {
		if let Some(binding) = self.bindings.get_mut(session_id) {
			binding.last_active_at = now;
		}
	}

	/// Removes the binding and returns the tab id the caller should
	/// consider closing.
	pub fn remove(&mut self, session_id: &str) -> Option<i32> {
		self.locked.remove(session_id);
		self.bindings.remove(session_id).map(|b| b.tab_id)
	}

	/// `browser_lock`/`browser_unlock` (action catalog): pins the home tab
	/// so implicit resolution never rebinds it out from under the caller,
	/// even if the tab later fails the scriptability filter. An explicit
	/// `tabId` on a request still overrides a lock — the spec gives
	/// explicit overrides priority over every other policy.
	pub fn lock(&mut self, session_id: &str) {
		self.locked.insert(session_id.to_string());
	}

	pub fn unlock(&mut self, session_id: &str) {
		self.locked.remove(session_id);
	}

	pub fn is_locked(&self, session_id: &str) -> bool {
		self.locked.contains(session_id)
	}

	/// All sessions currently bound to `tab_id` — used when a tab is
	/// reported closed out from under us and every affected session
	/// needs to be rebound on its next request.
	pub fn sessions_bound_to(&self, tab_id: i32) -> Vec<String> {
		self.bindings.iter().filter(|(_, b)| b.tab_id == tab_id).map(|(session, _)| session.clone()).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scriptability_filter_accepts_only_http_https() {
		assert!(is_scriptable_url("https://example.com"));
		assert!(is_scriptable_url("http://example.com"));
		assert!(!is_scriptable_url("chrome://extensions"));
		assert!(!is_scriptable_url("chrome-extension://abcdef/popup.html"));
		assert!(!is_scriptable_url("about:blank"));
	}

	#[test]
	fn scriptability_filter_excludes_web_store_hosts() {
		assert!(!is_scriptable_url("https://chromewebstore.google.com/detail/abcdef"));
		assert!(!is_scriptable_url("https://chrome.google.com/webstore/detail/abcdef"));
	}

	#[test]
	fn explicit_tab_id_overwrites_an_existing_binding() {
		let mut binder = Binder::new();
		binder.bind("s1", 10, 0.0);
		assert_eq!(binder.current("s1"), Some(10));

		binder.bind("s1", 20, 1.0);
		assert_eq!(binder.current("s1"), Some(20));
	}

	#[test]
	fn two_sessions_can_share_a_tab_explicitly() {
		let mut binder = Binder::new();
		binder.bind("s1", 10, 0.0);
		binder.bind("s2", 10, 0.0);
		let mut bound = binder.sessions_bound_to(10);
		bound.sort();
		assert_eq!(bound, vec!["s1".to_string(), "s2".to_string()]);
	}

	#[test]
	fn remove_returns_the_tab_that_was_bound() {
		let mut binder = Binder::new();
		binder.bind("s1", 10, 0.0);
		assert_eq!(binder.remove("s1"), Some(10));
		assert_eq!(binder.current("s1"), None);
	}

	#[test]
	fn lock_and_unlock_toggle_is_locked() {
		let mut binder = Binder::new();
		assert!(!binder.is_locked("s1"));
		binder.lock("s1");
		assert!(binder.is_locked("s1"));
		binder.unlock("s1");
		assert!(!binder.is_locked("s1"));
	}

	#[test]
	fn remove_also_clears_the_lock() {
		let mut binder = Binder::new();
		binder.bind("s1", 10, 0.0);
		binder.lock("s1");
		binder.remove("s1");
		assert!(!binder.is_locked("s1"));
	}
}
