//! `wasm_bindgen` extern bindings onto the subset of the `chrome.*`
//! extension APIs the side panel needs. Nothing in `web_sys` models
//! these, so each one is bound by hand against its JS namespace.

use js_sys::{Object, Promise};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = query)]
	pub fn tabs_query(query: &JsValue) -> Promise;

	#[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = create)]
	pub fn tabs_create(properties: &JsValue) -> Promise;

	#[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = get)]
	pub fn tabs_get(tab_id: i32) -> Promise;

	#[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = remove)]
	pub fn tabs_remove(tab_id: i32) -> Promise;

	#[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = update)]
	pub fn tabs_update(tab_id: i32, properties: &JsValue) -> Promise;

	/// `chrome.debugger.attach({tabId}, version)`. Attaching twice on an
	/// already-attached target rejects, which is how the executor tells
	/// an already-attached tab from a fresh one.
	#[wasm_bindgen(js_namespace = ["chrome", "debugger"], js_name = attach)]
	pub fn debugger_attach(target: &JsValue, version: &str) -> Promise;

	/// `chrome.debugger.sendCommand({tabId}, method, params)` — the one
	/// door onto the Chrome DevTools Protocol every action goes through.
	#[wasm_bindgen(js_namespace = ["chrome", "debugger"], js_name = sendCommand)]
	pub fn debugger_send_command(target: &JsValue, method: &str, params: &JsValue) -> Promise;

	/// `chrome.debugger.onEvent.addListener((source, method, params) => ...)`
	/// — how CDP events (network activity, dialogs) reach us outside of a
	/// `sendCommand` response.
	#[wasm_bindgen(js_namespace = ["chrome", "debugger", "onEvent"], js_name = addListener)]
	pub fn debugger_on_event_add_listener(callback: &Closure<dyn FnMut(JsValue, JsValue, JsValue)>);

	/// `chrome.tabs.onRemoved.addListener((tabId, removeInfo) => ...)`.
	#[wasm_bindgen(js_namespace = ["chrome", "tabs", "onRemoved"], js_name = addListener)]
	pub fn tabs_on_removed_add_listener(callback: &Closure<dyn FnMut(JsValue)>);
}

pub fn debug_target(tab_id: i32) -> JsValue {
	let target = Object::new();
	let _ = js_sys::Reflect::set(&target, &"tabId".into(), &JsValue::from_f64(tab_id as f64));
	target.into()
}
