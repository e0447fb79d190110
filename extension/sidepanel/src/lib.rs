//! Extension Side Panel (C5): the daemon's (or direct-mode helper's)
//! WebSocket peer. Accepts `REQUEST` frames, resolves them to a tab
//! through the [`binder`], dispatches to the CDP [`executor`], and
//! replies with `RESPONSE`.
//!
//! This module is the only one that knows what a *tab* is; it never
//! sees an agent, only opaque session ids and explicit `tabId`
//! overrides.

mod binder;
mod chrome;
mod connection;
mod executor;

use std::cell::RefCell;
use std::rc::Rc;

use bridge_protocol::Action;
use bridge_protocol::Message;
use js_sys::{Array, Reflect};
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

use binder::{Binder, is_scriptable_url};
use connection::Uplink;

/// `daemon::extension::upgrade` binds its WebSocket route at
/// `/extension`; the direct-mode helper fallback (`helper::direct_link`)
/// binds the identical path on the same host/port pair, so one URL
/// reaches whichever is listening.
const DEFAULT_WS_URL: &str = "ws://127.0.0.1:3026/extension";

thread_local! {
	static STATE: Rc<RefCell<Binder>> = Rc::new(RefCell::new(Binder::new()));
	static UPLINK: RefCell<Option<Rc<Uplink>>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() {
	console_error_panic_hook::set_once();

	let uplink = Uplink::new(DEFAULT_WS_URL.to_string(), on_message, on_status_change);
	uplink.connect();
	UPLINK.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&uplink)));

	register_debugger_event_listener();
	register_tab_removed_listener();

	log("side panel started");
}

/// Exposed to the side panel UI's manual "reconnect" control, which
/// resets the backoff attempt counter.
#[wasm_bindgen]
pub fn reconnect() {
	UPLINK.with(|slot| {
		if let Some(uplink) = slot.borrow().as_ref() {
			uplink.reconnect_now();
		}
	});
}

fn on_status_change(connected: bool) {
	log(&format!("uplink {}", if connected { "connected" } else { "disconnected" }));
}

fn on_message(message: Message) {
	match message {
		Message::Request { req_id, session_id, action, params, tab_id } => {
			spawn_local(handle_request(req_id, session_id, action, params, tab_id));
		}
		Message::SessionStart { session_id } => {
			// No-op by design: eagerly allocating a tab here would spawn
			// a window for an agent that only ever checks status.
			log(&format!("session started: {session_id}"));
		}
		Message::SessionEnd { session_id } => {
			handle_session_end(session_id);
		}
		other => {
			log(&format!("ignoring unexpected message from uplink: {other:?}"));
		}
	}
}

fn handle_session_end(session_id: String) {
	let tab_to_close = STATE.with(|state| state.borrow_mut().remove(&session_id));
	executor::forget_tab(tab_to_close.unwrap_or(-1));
	if let Some(tab_id) = tab_to_close {
		spawn_local(async move {
			let _ = JsFuture::from(chrome::tabs_remove(tab_id)).await;
		});
	}
}

async fn handle_request(req_id: String, session_id: Option<String>, action: Action, params: Value, tab_id: Option<String>) {
	let response = match resolve_tab(session_id.as_deref(), tab_id.as_deref()).await {
		Ok(tab) => run_action(session_id.as_deref(), tab, action, params).await,
		Err(message) => Err(message),
	};

	let message = match response {
		Ok(data) => Message::Response { req_id, session_id, ok: true, data: Some(data), error: None },
		Err(error) => Message::Response { req_id, session_id, ok: false, data: None, error: Some(error) },
	};

	UPLINK.with(|slot| {
		if let Some(uplink) = slot.borrow().as_ref() {
			uplink.send(&message);
		}
	});
}

async fn run_action(session_id: Option<&str>, tab_id: i32, action: Action, params: Value) -> Result<Value, String> {
	match action {
		Action::Lock => {
			if let Some(session_id) = session_id {
				STATE.with(|state| state.borrow_mut().lock(session_id));
			}
			Ok(json!({"locked": true}))
		}
		Action::Unlock => {
			if let Some(session_id) = session_id {
				STATE.with(|state| state.borrow_mut().unlock(session_id));
			}
			Ok(json!({"locked": false}))
		}
		_ => executor::execute(tab_id, action, params).await,
	}
}

/// Resolution order: explicit `tabId` first, then the session's
/// binding, then the window's active tab — creating a fresh tab
/// whenever nothing scriptable is available.
async fn resolve_tab(session_id: Option<&str>, explicit_tab_id: Option<&str>) -> Result<i32, String> {
	let now = js_sys::Date::now();

	if let Some(raw) = explicit_tab_id {
		let tab_id: i32 = raw.parse().map_err(|_| "tab not found".to_string())?;
		if tab_exists(tab_id).await.is_none() {
			return Err("tab not found".to_string());
		}
		if let Some(session_id) = session_id {
			STATE.with(|state| state.borrow_mut().bind(session_id, tab_id, now));
		}
		return Ok(tab_id);
	}

	if let Some(session_id) = session_id {
		let bound = STATE.with(|state| state.borrow().current(session_id));
		if let Some(tab_id) = bound {
			if tab_exists(tab_id).await.is_some() {
				STATE.with(|state| state.borrow_mut().touch(session_id, now));
				return Ok(tab_id);
			}
			if STATE.with(|state| state.borrow().is_locked(session_id)) {
				return Err("tab not found".to_string());
			}
		}
		let tab_id = open_fresh_tab().await?;
		STATE.with(|state| state.borrow_mut().bind(session_id, tab_id, now));
		return Ok(tab_id);
	}

	active_or_fresh_tab().await
}

async fn tab_exists(tab_id: i32) -> Option<String> {
	let result = JsFuture::from(chrome::tabs_get(tab_id)).await.ok()?;
	Reflect::get(&result, &"url".into()).ok()?.as_string()
}

async fn open_fresh_tab() -> Result<i32, String> {
	let properties = serde_wasm_bindgen::to_value(&json!({"url": "about:blank"})).map_err(|err| err.to_string())?;
	let tab = JsFuture::from(chrome::tabs_create(&properties)).await.map_err(|err| format!("{err:?}"))?;
	Reflect::get(&tab, &"id".into()).ok().and_then(|v| v.as_f64()).map(|id| id as i32).ok_or_else(|| "chrome.tabs.create returned no id".to_string())
}

async fn active_or_fresh_tab() -> Result<i32, String> {
	let query = serde_wasm_bindgen::to_value(&json!({"active": true, "currentWindow": true})).map_err(|err| err.to_string())?;
	let tabs_val = JsFuture::from(chrome::tabs_query(&query)).await.map_err(|err| format!("{err:?}"))?;
	let tabs = Array::from(&tabs_val);

	if tabs.length() > 0 {
		let tab = tabs.get(0);
		let id = Reflect::get(&tab, &"id".into()).ok().and_then(|v| v.as_f64()).map(|id| id as i32);
		let url = Reflect::get(&tab, &"url".into()).ok().and_then(|v| v.as_string()).unwrap_or_default();
		if let Some(id) = id {
			if is_scriptable_url(&url) {
				return Ok(id);
			}
		}
	}

	open_fresh_tab().await
}

fn register_debugger_event_listener() {
	let closure = Closure::<dyn FnMut(JsValue, JsValue, JsValue)>::new(|source: JsValue, method: JsValue, params: JsValue| {
		let Some(tab_id) = Reflect::get(&source, &"tabId".into()).ok().and_then(|v| v.as_f64()).map(|id| id as i32) else { return };
		let Some(method) = method.as_string() else { return };
		let params: Value = serde_wasm_bindgen::from_value(params).unwrap_or(Value::Null);
		executor::record_debugger_event(tab_id, &method, params);
	});
	chrome::debugger_on_event_add_listener(&closure);
	closure.forget();
}

fn register_tab_removed_listener() {
	let closure = Closure::<dyn FnMut(JsValue)>::new(|tab_id: JsValue| {
		let Some(tab_id) = tab_id.as_f64().map(|id| id as i32) else { return };
		executor::forget_tab(tab_id);
		let affected = STATE.with(|state| state.borrow().sessions_bound_to(tab_id));
		for session_id in affected {
			log(&format!("tab {tab_id} closed; {session_id}'s binding will be recreated on its next request"));
		}
	});
	chrome::tabs_on_removed_add_listener(&closure);
	closure.forget();
}

fn log(msg: &str) {
	web_sys::console::log_1(&format!("[browser-bridge sidepanel] {msg}").into());
}
