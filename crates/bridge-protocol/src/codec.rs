//! Wire Codec (spec §4.1, C1): "encodes each message as one UTF-8 JSON
//! object followed by a single LF byte on a reliable, ordered byte
//! stream." This module only owns the per-message encode/decode; the
//! buffered, partial-frame-aware reader that applies the oversize-buffer
//! and partial-frame-on-close rules lives in `bridge-core` (it needs an
//! async byte stream, which would pull `tokio` into this crate and into
//! the WASM side panel build).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Error as JsonError;

/// Recommended cap from spec §4.1: "oversize buffer (exceeds an
/// implementation-chosen cap, recommended 1 MiB) -> treat as fatal and
/// drop the connection."
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Encode one message as a single newline-terminated JSON line.
pub fn encode_line<T: Serialize>(message: &T) -> Result<Vec<u8>, JsonError> {
	let mut bytes = serde_json::to_vec(message)?;
	bytes.push(b'\n');
	Ok(bytes)
}

/// Decode one already-delimited line (no trailing LF) into a message.
/// Malformed JSON surfaces as an error; per spec §4.1 the caller is
/// responsible for logging and dropping the line rather than the
/// connection.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, JsonError> {
	serde_json::from_str(line.trim_end_matches('\r'))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Message;

	#[test]
	fn encode_appends_single_lf() {
		let bytes = encode_line(&Message::Ping).unwrap();
		assert_eq!(bytes.last(), Some(&b'\n'));
		assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);
	}

	#[test]
	fn decode_rejects_malformed_json() {
		let err = decode_line::<Message>("{not json");
		assert!(err.is_err());
	}

	#[test]
	fn decode_strips_trailing_cr() {
		let msg: Message = decode_line("{\"kind\":\"PING\"}\r").unwrap();
		assert_eq!(msg, Message::Ping);
	}
}
