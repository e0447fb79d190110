//! Structured errors for the router core (spec §7 "Error handling
//! design"): one enum per error family (*Transport*, *Routing*,
//! *Action*), each producing both a stable `code()` and the
//! human-readable `wire_message()` string carried in a RESPONSE's
//! `error` field or an MCP error payload.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Debug, Error)]
pub enum RouterError {
	// --- Transport (spec §7) ---
	#[error("extension not connected")]
	ExtensionNotConnected,

	#[error("daemon not connected")]
	DaemonNotConnected,

	#[error("timed out waiting for a response")]
	Timeout,

	#[error("frame exceeded the maximum buffer size ({0} bytes)")]
	BufferOverflow(usize),

	#[error("malformed frame: {0}")]
	MalformedFrame(#[from] serde_json::Error),

	// --- Routing (spec §7) ---
	#[error("unknown session: {0}")]
	UnknownSession(String),

	#[error("unknown reqId: {0}")]
	UnknownReqId(String),

	#[error("tab not found: {0}")]
	TabNotFound(String),

	#[error("session limit exceeded ({0} active)")]
	SessionLimitExceeded(usize),

	// --- Action (spec §7) ---
	#[error("unknown action: {0}")]
	UnknownAction(String),

	#[error("invalid parameters for action {action}: {reason}")]
	InvalidActionParams { action: &'static str, reason: String },

	#[error("action failed: {0}")]
	ActionFailed(serde_json::Value),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl RouterError {
	/// A stable, machine-matchable identifier for this failure, independent
	/// of the human-readable message (which may change).
	pub fn code(&self) -> &'static str {
		match self {
			RouterError::ExtensionNotConnected => "EXTENSION_NOT_CONNECTED",
			RouterError::DaemonNotConnected => "DAEMON_NOT_CONNECTED",
			RouterError::Timeout => "TIMEOUT",
			RouterError::BufferOverflow(_) => "BUFFER_OVERFLOW",
			RouterError::MalformedFrame(_) => "MALFORMED_FRAME",
			RouterError::UnknownSession(_) => "UNKNOWN_SESSION",
			RouterError::UnknownReqId(_) => "UNKNOWN_REQ_ID",
			RouterError::TabNotFound(_) => "TAB_NOT_FOUND",
			RouterError::SessionLimitExceeded(_) => "SESSION_LIMIT_EXCEEDED",
			RouterError::UnknownAction(_) => "UNKNOWN_ACTION",
			RouterError::InvalidActionParams { .. } => "INVALID_ACTION_PARAMS",
			RouterError::ActionFailed(_) => "ACTION_FAILED",
			RouterError::Io(_) => "IO_ERROR",
		}
	}

	/// The string to carry on the wire in a RESPONSE's `error` field, or
	/// surface as an MCP tool error.
	pub fn wire_message(&self) -> String {
		format!("{}: {}", self.code(), self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wire_message_embeds_code_and_detail() {
		let err = RouterError::UnknownSession("sess_x".into());
		assert_eq!(err.wire_message(), "UNKNOWN_SESSION: unknown session: sess_x");
	}
}
