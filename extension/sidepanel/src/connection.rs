//! WebSocket uplink to the Daemon (or, in direct mode, the Helper
//! standing in for one). Fixed backoff up to a small retry cap; a
//! manual reconnect resets it. While disconnected no request can
//! arrive, since the daemon has nothing to forward over.

use std::cell::RefCell;
use std::rc::Rc;

use bridge_protocol::{Message, codec};
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

const RECONNECT_BACKOFF_MS: i32 = 2_000;
const RECONNECT_MAX_ATTEMPTS: u32 = 5;

type OnMessage = Rc<dyn Fn(Message)>;
type OnStatusChange = Rc<dyn Fn(bool)>;

pub struct Uplink {
	url: String,
	ws: RefCell<Option<WebSocket>>,
	attempts: RefCell<u32>,
	on_message: OnMessage,
	on_status_change: OnStatusChange,
}

impl Uplink {
	pub fn new(url: String, on_message: impl Fn(Message) + 'static, on_status_change: impl Fn(bool) + 'static) -> Rc<Self> {
		Rc::new(Self {
			url,
			ws: RefCell::new(None),
			attempts: RefCell::new(0),
			on_message: Rc::new(on_message),
			on_status_change: Rc::new(on_status_change),
		})
	}

	pub fn is_connected(&self) -> bool {
		self.ws.borrow().as_ref().is_some_and(|ws| ws.ready_state() == WebSocket::OPEN)
	}

	pub fn send(&self, message: &Message) -> bool {
		let Ok(bytes) = codec::encode_line(message) else { return false };
		let Ok(text) = String::from_utf8(bytes) else { return false };
		match self.ws.borrow().as_ref() {
			Some(ws) if ws.ready_state() == WebSocket::OPEN => ws.send_with_str(text.trim_end()).is_ok(),
			_ => false,
		}
	}

	/// A manual reconnect from the UI resets the retry cap.
	pub fn reconnect_now(self: &Rc<Self>) {
		*self.attempts.borrow_mut() = 0;
		self.connect();
	}

	pub fn connect(self: &Rc<Self>) {
		let ws = match WebSocket::new(&self.url) {
			Ok(ws) => ws,
			Err(_) => {
				self.schedule_reconnect();
				return;
			}
		};

		{
			let on_message = Rc::clone(&self.on_message);
			let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
				let Some(text) = event.data().as_string() else { return };
				if let Ok(message) = codec::decode_line::<Message>(text.trim_end()) {
					on_message(message);
				}
			});
			ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
			onmessage.forget();
		}

		{
			let this = Rc::clone(self);
			let onopen = Closure::<dyn FnMut()>::new(move || {
				*this.attempts.borrow_mut() = 0;
				(this.on_status_change)(true);
			});
			ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
			onopen.forget();
		}

		{
			let this = Rc::clone(self);
			let onclose = Closure::<dyn FnMut(CloseEvent)>::new(move |_| {
				*this.ws.borrow_mut() = None;
				(this.on_status_change)(false);
				this.schedule_reconnect();
			});
			ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
			onclose.forget();
		}

		{
			let onerror = Closure::<dyn FnMut(ErrorEvent)>::new(|_event: ErrorEvent| {});
			ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
			onerror.forget();
		}

		*self.ws.borrow_mut() = Some(ws);
	}

	fn schedule_reconnect(self: &Rc<Self>) {
		let mut attempts = self.attempts.borrow_mut();
		if *attempts >= RECONNECT_MAX_ATTEMPTS {
			return;
		}
		*attempts += 1;
		drop(attempts);

		let this = Rc::clone(self);
		let closure = Closure::once(Box::new(move || {
			this.connect();
		}) as Box<dyn FnOnce()>);

		if let Some(window) = web_sys::window() {
			let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), RECONNECT_BACKOFF_MS);
		}
		closure.forget();
	}
}
