//! Action Executor: the CDP-speaking half of the side panel. Every
//! `action` ends up here as one or more `chrome.debugger.sendCommand`
//! calls against the resolved tab.
//!
//! **Non-goal carried from the spec:** this executor does not implement
//! a separate "content helper" script; CDP's `Runtime`/`DOM`/`Input`
//! domains cover every action in the catalog directly, so "injection"
//! (spec §4.5 step 3) reduces to "is the debugger attached to this tab
//! yet", which [`ensure_attached`] makes idempotent the same way a
//! ping-based injection check would.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::HashSet;

use bridge_protocol::Action;
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::chrome;

const CDP_VERSION: &str = "1.3";
const POLL_INTERVAL_MS: i32 = 100;

thread_local! {
	static ATTACHED: RefCell<HashSet<i32>> = RefCell::new(HashSet::new());
	/// Captured `Network.*` events per tab, oldest first (spec action
	/// `get_network_requests`); trimmed so a long-lived tab can't grow
	/// this without bound.
	static NETWORK_LOG: RefCell<HashMap<i32, Vec<Value>>> = RefCell::new(HashMap::new());
	/// The most recent `Page.javascriptDialogOpening` per tab, cleared
	/// once `handle_dialog` answers it.
	static OPEN_DIALOG: RefCell<HashMap<i32, Value>> = RefCell::new(HashMap::new());
}

const MAX_NETWORK_LOG_PER_TAB: usize = 500;

pub fn record_debugger_event(tab_id: i32, method: &str, params: Value) {
	match method {
		"Network.requestWillBeSent" | "Network.responseReceived" | "Network.loadingFinished" | "Network.loadingFailed" => {
			NETWORK_LOG.with(|log| {
				let mut log = log.borrow_mut();
				let entries = log.entry(tab_id).or_default();
				entries.push(json!({"event": method, "params": params}));
				if entries.len() > MAX_NETWORK_LOG_PER_TAB {
					entries.remove(0);
				}
			});
		}
		"Page.javascriptDialogOpening" => {
			OPEN_DIALOG.with(|dialogs| dialogs.borrow_mut().insert(tab_id, params));
		}
		"Page.javascriptDialogClosed" => {
			OPEN_DIALOG.with(|dialogs| dialogs.borrow_mut().remove(&tab_id));
		}
		_ => {}
	}
}

/// Attaches the debugger to `tab_id` if it is not already attached.
/// `chrome.debugger.attach` rejects on an already-attached target, which
/// is exactly the signal an idempotent injection check needs.
async fn ensure_attached(tab_id: i32) -> Result<(), String> {
	if ATTACHED.with(|a| a.borrow().contains(&tab_id)) {
		return Ok(());
	}
	let target = chrome::debug_target(tab_id);
	let result = JsFuture::from(chrome::debugger_attach(&target, CDP_VERSION)).await;
	match result {
		Ok(_) => {
			ATTACHED.with(|a| a.borrow_mut().insert(tab_id));
			let _ = cdp(tab_id, "Page.enable", json!({})).await;
			let _ = cdp(tab_id, "Network.enable", json!({})).await;
			let _ = cdp(tab_id, "DOM.enable", json!({})).await;
			Ok(())
		}
		Err(err) => {
			// Already attached (e.g. devtools open, or a race with
			// ourselves) is not a failure for our purposes.
			if js_error_message(&err).contains("already attach") {
				ATTACHED.with(|a| a.borrow_mut().insert(tab_id));
				Ok(())
			} else {
				Err(js_error_message(&err))
			}
		}
	}
}

pub fn forget_tab(tab_id: i32) {
	ATTACHED.with(|a| a.borrow_mut().remove(&tab_id));
	NETWORK_LOG.with(|log| log.borrow_mut().remove(&tab_id));
	OPEN_DIALOG.with(|dialogs| dialogs.borrow_mut().remove(&tab_id));
}

fn js_error_message(value: &JsValue) -> String {
	js_sys::Reflect::get(value, &"message".into()).ok().and_then(|v| v.as_string()).unwrap_or_else(|| format!("{value:?}"))
}

async fn cdp(tab_id: i32, method: &str, params: Value) -> Result<Value, String> {
	let target = chrome::debug_target(tab_id);
	let params_js = serde_wasm_bindgen::to_value(&params).map_err(|err| err.to_string())?;
	let result = JsFuture::from(chrome::debugger_send_command(&target, method, &params_js)).await.map_err(|err| js_error_message(&err))?;
	serde_wasm_bindgen::from_value(result).map_err(|err| err.to_string())
}

async fn eval_value(tab_id: i32, expression: &str) -> Result<Value, String> {
	let result = cdp(tab_id, "Runtime.evaluate", json!({"expression": expression, "returnByValue": true, "awaitPromise": true})).await?;
	if let Some(exception) = result.get("exceptionDetails") {
		return Err(exception.get("text").and_then(Value::as_str).unwrap_or("evaluation threw").to_string());
	}
	Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
}

async fn element_rect(tab_id: i32, selector: &str) -> Result<(f64, f64), String> {
	let expression = format!(
		"(() => {{ const el = document.querySelector({selector:?}); if (!el) return null; const r = el.getBoundingClientRect(); return {{x: r.left + r.width/2, y: r.top + r.height/2}}; }})()",
		selector = selector
	);
	let value = eval_value(tab_id, &expression).await?;
	if value.is_null() {
		return Err(format!("no element matches selector {selector:?}"));
	}
	let x = value.get("x").and_then(Value::as_f64).ok_or("missing x")?;
	let y = value.get("y").and_then(Value::as_f64).ok_or("missing y")?;
	Ok((x, y))
}

async fn click_at(tab_id: i32, x: f64, y: f64, button: &str, click_count: u32) -> Result<(), String> {
	for kind in ["mousePressed", "mouseReleased"] {
		cdp(tab_id, "Input.dispatchMouseEvent", json!({"type": kind, "x": x, "y": y, "button": button, "clickCount": click_count})).await?;
	}
	Ok(())
}

fn selector_of(params: &Value) -> Result<&str, String> {
	params.get("selector").and_then(Value::as_str).ok_or_else(|| "missing 'selector'".to_string())
}

pub async fn execute(tab_id: i32, action: Action, params: Value) -> Result<Value, String> {
	ensure_attached(tab_id).await?;

	match action {
		Action::Navigate => {
			let url = params.get("url").and_then(Value::as_str).ok_or("missing 'url'")?;
			cdp(tab_id, "Page.navigate", json!({"url": url})).await
		}
		Action::Click => {
			let (x, y) = element_rect(tab_id, selector_of(&params)?).await?;
			click_at(tab_id, x, y, "left", 1).await?;
			Ok(json!({"x": x, "y": y}))
		}
		Action::DoubleClick => {
			let (x, y) = element_rect(tab_id, selector_of(&params)?).await?;
			click_at(tab_id, x, y, "left", 2).await?;
			Ok(json!({"x": x, "y": y}))
		}
		Action::RightClick => {
			let (x, y) = element_rect(tab_id, selector_of(&params)?).await?;
			click_at(tab_id, x, y, "right", 1).await?;
			Ok(json!({"x": x, "y": y}))
		}
		Action::Hover => {
			let (x, y) = element_rect(tab_id, selector_of(&params)?).await?;
			cdp(tab_id, "Input.dispatchMouseEvent", json!({"type": "mouseMoved", "x": x, "y": y})).await
		}
		Action::Type => {
			let text = params.get("text").and_then(Value::as_str).ok_or("missing 'text'")?;
			cdp(tab_id, "Input.insertText", json!({"text": text})).await
		}
		Action::PressKey => {
			let key = params.get("key").and_then(Value::as_str).ok_or("missing 'key'")?;
			for kind in ["keyDown", "keyUp"] {
				cdp(tab_id, "Input.dispatchKeyEvent", json!({"type": kind, "key": key})).await?;
			}
			Ok(Value::Null)
		}
		Action::Scroll => {
			let dx = params.get("dx").and_then(Value::as_f64).unwrap_or(0.0);
			let dy = params.get("dy").and_then(Value::as_f64).unwrap_or(0.0);
			eval_value(tab_id, &format!("window.scrollBy({dx}, {dy})")).await
		}
		Action::Screenshot => {
			let result = cdp(tab_id, "Page.captureScreenshot", json!({"format": "png"})).await?;
			let data = result.get("data").and_then(Value::as_str).ok_or("no screenshot data returned")?;
			Ok(json!({"image": {"data": data, "mimeType": "image/png"}}))
		}
		Action::Evaluate => {
			let expression = params.get("expression").and_then(Value::as_str).ok_or("missing 'expression'")?;
			eval_value(tab_id, expression).await
		}
		Action::GetPageInfo => eval_value(tab_id, "({url: location.href, title: document.title})").await,
		Action::GetDomTree => cdp(tab_id, "DOM.getDocument", json!({"depth": -1, "pierce": true})).await,
		Action::GetTabs => get_tabs().await,
		Action::SwitchTab => {
			let target_tab = params.get("tabId").and_then(Value::as_str).and_then(|s| s.parse::<i32>().ok()).ok_or("missing or invalid 'tabId'")?;
			JsFuture::from(chrome::tabs_update(target_tab, &serde_wasm_bindgen::to_value(&json!({"active": true})).map_err(|e| e.to_string())?))
				.await
				.map_err(|err| js_error_message(&err))?;
			Ok(json!({"tabId": target_tab}))
		}
		Action::WaitForSelector => {
			let selector = selector_of(&params)?.to_string();
			let timeout_ms = params.get("timeoutMs").and_then(Value::as_u64).unwrap_or(30_000);
			poll_until(timeout_ms, || {
				let selector = selector.clone();
				async move {
					let expr = format!("document.querySelector({selector:?}) !== null", selector = selector);
					eval_value(tab_id, &expr).await.map(|v| v.as_bool().unwrap_or(false))
				}
			})
			.await
		}
		Action::WaitForLoadState => poll_until(30_000, || async move { eval_value(tab_id, "document.readyState === 'complete'").await.map(|v| v.as_bool().unwrap_or(false)) }).await,
		Action::WaitForFunction => {
			let expression = params.get("expression").and_then(Value::as_str).ok_or("missing 'expression'")?.to_string();
			let timeout_ms = params.get("timeoutMs").and_then(Value::as_u64).unwrap_or(30_000);
			poll_until(timeout_ms, || {
				let expression = expression.clone();
				async move { eval_value(tab_id, &expression).await.map(|v| truthy(&v)) }
			})
			.await
		}
		Action::EnableNetwork => cdp(tab_id, "Network.enable", json!({})).await,
		Action::GetNetworkRequests => Ok(json!({"requests": NETWORK_LOG.with(|log| log.borrow().get(&tab_id).cloned().unwrap_or_default())})),
		Action::WaitForResponse => {
			let pattern = params.get("urlPattern").and_then(Value::as_str).ok_or("missing 'urlPattern'")?.to_string();
			let timeout_ms = params.get("timeoutMs").and_then(Value::as_u64).unwrap_or(30_000);
			poll_until(timeout_ms, move || {
				let pattern = pattern.clone();
				async move {
					Ok(NETWORK_LOG.with(|log| {
						log.borrow()
							.get(&tab_id)
							.is_some_and(|entries| entries.iter().any(|e| e.pointer("/params/response/url").and_then(Value::as_str).is_some_and(|url| url.contains(&pattern))))
					}))
				}
			})
			.await
		}
		Action::UploadFile => {
			let selector = selector_of(&params)?;
			let path = params.get("path").and_then(Value::as_str).ok_or("missing 'path'")?;
			let node = cdp(tab_id, "DOM.getDocument", json!({})).await?;
			let root_id = node.pointer("/root/nodeId").and_then(Value::as_i64).ok_or("no document root")?;
			let found = cdp(tab_id, "DOM.querySelector", json!({"nodeId": root_id, "selector": selector})).await?;
			let node_id = found.get("nodeId").and_then(Value::as_i64).ok_or_else(|| format!("no element matches selector {selector:?}"))?;
			cdp(tab_id, "DOM.setFileInputFiles", json!({"files": [path], "nodeId": node_id})).await
		}
		Action::GetDialog => Ok(json!({"dialog": OPEN_DIALOG.with(|d| d.borrow().get(&tab_id).cloned())})),
		Action::HandleDialog => {
			let accept = params.get("accept").and_then(Value::as_bool).unwrap_or(true);
			let prompt_text = params.get("promptText").and_then(Value::as_str);
			let mut cdp_params = json!({"accept": accept});
			if let Some(text) = prompt_text {
				cdp_params["promptText"] = Value::String(text.to_string());
			}
			let result = cdp(tab_id, "Page.handleJavaScriptDialog", cdp_params).await;
			OPEN_DIALOG.with(|d| d.borrow_mut().remove(&tab_id));
			result
		}
		Action::Download => {
			let selector = selector_of(&params)?;
			cdp(tab_id, "Page.setDownloadBehavior", json!({"behavior": "allow"})).await?;
			let (x, y) = element_rect(tab_id, selector).await?;
			click_at(tab_id, x, y, "left", 1).await?;
			Ok(json!({"triggered": true}))
		}
		Action::Lock | Action::Unlock => {
			// Binder-level policy, resolved above this call in `lib.rs`
			// before the action ever reaches the executor.
			Ok(Value::Null)
		}
		Action::UpdateStatus => {
			let text = params.get("text").and_then(Value::as_str).unwrap_or_default();
			web_sys::console::log_1(&format!("[status] {text}").into());
			Ok(Value::Null)
		}
	}
}

fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		Value::String(s) => !s.is_empty(),
		_ => true,
	}
}

async fn poll_until<F, Fut>(timeout_ms: u64, mut check: F) -> Result<Value, String>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<bool, String>>,
{
	let deadline_polls = (timeout_ms as i32 / POLL_INTERVAL_MS).max(1);
	for _ in 0..deadline_polls {
		if check().await? {
			return Ok(json!({"satisfied": true}));
		}
		sleep(POLL_INTERVAL_MS).await;
	}
	Err("timed out waiting for condition".to_string())
}

async fn sleep(ms: i32) {
	let promise = js_sys::Promise::new(&mut |resolve, _reject| {
		if let Some(window) = web_sys::window() {
			let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
		}
	});
	let _ = JsFuture::from(promise).await;
}

async fn get_tabs() -> Result<Value, String> {
	let query = serde_wasm_bindgen::to_value(&json!({})).map_err(|e| e.to_string())?;
	let tabs_val = JsFuture::from(chrome::tabs_query(&query)).await.map_err(|err| js_error_message(&err))?;
	serde_wasm_bindgen::from_value(tabs_val).map_err(|err| err.to_string())
}
