//! Wire message shapes shared by Helper<->Daemon (local IPC) and
//! Daemon<->Extension (WebSocket) per spec §3 and §6. Both hops carry the
//! same envelope set over the same newline-JSON encoding (see [`crate::codec`]);
//! only the transport differs, so one `Message` enum serves both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;

/// One message on the wire. Tagged by `kind`, matching spec §3's
/// `{kind=REQUEST, ...}` shape literally: `Message::Request` serializes
/// with `"kind":"REQUEST"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
	/// Helper -> Daemon: ask for a fresh session.
	Register,
	/// Daemon -> Helper: session created.
	RegisterOk { session_id: String },
	/// Daemon -> Helper: session could not be created (e.g. MAX_SESSIONS).
	RegisterError { message: String },

	/// Helper -> Daemon, or Daemon -> Extension: a tool call.
	Request {
		req_id: String,
		#[serde(skip_serializing_if = "Option::is_none", default)]
		session_id: Option<String>,
		action: Action,
		#[serde(default)]
		params: Value,
		#[serde(skip_serializing_if = "Option::is_none", default)]
		tab_id: Option<String>,
	},
	/// Extension -> Daemon, or Daemon -> Helper: the matching outcome.
	Response {
		req_id: String,
		#[serde(skip_serializing_if = "Option::is_none", default)]
		session_id: Option<String>,
		ok: bool,
		#[serde(skip_serializing_if = "Option::is_none", default)]
		data: Option<Value>,
		#[serde(skip_serializing_if = "Option::is_none", default)]
		error: Option<String>,
	},

	/// Helper -> Daemon: liveness probe, refreshes `lastActiveAt`.
	Ping,
	/// Daemon -> Helper: liveness reply.
	Pong,

	/// Helper -> Daemon: ask for router state.
	Status,
	/// Daemon -> Helper: live extension/session state, never cached.
	StatusOk {
		extension_connected: bool,
		active_sessions: usize,
	},

	/// Helper -> Daemon: end a session early.
	Disconnect { session_id: String },

	/// Daemon -> Extension: a session was created (out-of-band, §3).
	SessionStart { session_id: String },
	/// Daemon -> Extension: a session ended (out-of-band, §3).
	SessionEnd { session_id: String },
}

impl Message {
	/// `reqId` if this variant carries one, for log lines (spec §7
	/// Observability: "every REQUEST ... every RESPONSE outcome").
	pub fn req_id(&self) -> Option<&str> {
		match self {
			Message::Request { req_id, .. } | Message::Response { req_id, .. } => Some(req_id),
			_ => None,
		}
	}

	/// `sessionId` if this variant carries one.
	pub fn session_id(&self) -> Option<&str> {
		match self {
			Message::RegisterOk { session_id }
			| Message::Disconnect { session_id }
			| Message::SessionStart { session_id }
			| Message::SessionEnd { session_id } => Some(session_id),
			Message::Request { session_id, .. } | Message::Response { session_id, .. } => session_id.as_deref(),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn register_ok_round_trips() {
		let msg = Message::RegisterOk { session_id: "sess_abc".into() };
		let json = serde_json::to_string(&msg).unwrap();
		assert_eq!(json, r#"{"kind":"REGISTER_OK","session_id":"sess_abc"}"#);
		let back: Message = serde_json::from_str(&json).unwrap();
		assert_eq!(back, msg);
	}

	#[test]
	fn request_carries_typed_action() {
		let msg = Message::Request {
			req_id: "sess_abc:1".into(),
			session_id: Some("sess_abc".into()),
			action: Action::Navigate,
			params: serde_json::json!({"url": "https://example.com"}),
			tab_id: None,
		};
		let json = serde_json::to_value(&msg).unwrap();
		assert_eq!(json["kind"], "REQUEST");
		assert_eq!(json["action"], "navigate");
		assert!(json.get("tab_id").is_none());
	}

	#[test]
	fn unknown_action_is_a_decode_error() {
		let raw = r#"{"kind":"REQUEST","req_id":"x:1","action":"teleport","params":{}}"#;
		let err = serde_json::from_str::<Message>(raw).unwrap_err();
		assert!(err.to_string().contains("unknown action"));
	}

	#[test]
	fn session_start_tag_matches_spec_shape() {
		let msg = Message::SessionStart { session_id: "sess_abc".into() };
		let json = serde_json::to_string(&msg).unwrap();
		assert_eq!(json, r#"{"kind":"SESSION_START","session_id":"sess_abc"}"#);
	}
}
