//! The buffered half of the Wire Codec (spec §4.1, C1): "A decoder
//! maintains a per-connection byte buffer; it emits objects once a
//! terminator is found and the prefix parses." `bridge_protocol::codec`
//! handles the per-message JSON shape; this module owns the async,
//! bounded-buffer line framing over a real byte stream, which is why it
//! lives here rather than in the `tokio`-free `bridge-protocol` crate.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, RouterError};

/// Reads newline-delimited lines off an async byte stream, enforcing the
/// bounded buffer from spec §4.1 ("oversize buffer ... treat as fatal
/// and drop the connection") and the partial-frame-on-close rule
/// ("partial frame on close -> discard").
pub struct FramedLineReader<R> {
	inner: R,
	buf: Vec<u8>,
	max_bytes: usize,
}

impl<R: AsyncRead + Unpin> FramedLineReader<R> {
	pub fn new(inner: R) -> Self {
		Self::with_capacity(inner, bridge_protocol::MAX_FRAME_BYTES)
	}

	pub fn with_capacity(inner: R, max_bytes: usize) -> Self {
		Self { inner, buf: Vec::new(), max_bytes }
	}

	/// Returns the next complete line (without its trailing `\n`), `None`
	/// on a clean close with no dangling partial frame (or a discarded
	/// partial frame), or a fatal [`RouterError::BufferOverflow`] once the
	/// buffer exceeds `max_bytes`. Malformed JSON is *not* this type's
	/// concern: the caller decodes the returned line and, per spec §4.1,
	/// logs and skips it without dropping the connection.
	pub async fn next_line(&mut self) -> Result<Option<String>> {
		loop {
			if let Some(pos) = self.buf.iter().position(|byte| *byte == b'\n') {
				// `pos` is the line's own length, excluding the LF. A line at
				// exactly `max_bytes` is accepted (spec §8: "Buffer at
				// MAX_BUFFER_SIZE exactly: accepted"); only a line that itself
				// exceeds the cap is fatal.
				if pos > self.max_bytes {
					return Err(RouterError::BufferOverflow(pos));
				}
				let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
				line.pop(); // trailing \n
				return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
			}

			let mut chunk = [0u8; 8192];
			let n = self.inner.read(&mut chunk).await.map_err(RouterError::Io)?;
			if n == 0 {
				// EOF: any bytes left in `self.buf` are a partial frame, discarded.
				return Ok(None);
			}
			self.buf.extend_from_slice(&chunk[..n]);

			// No terminator yet: an ever-growing line past the cap is still
			// fatal, guarding against unbounded memory growth while waiting
			// on a delimiter that may never arrive.
			if self.buf.len() > self.max_bytes {
				return Err(RouterError::BufferOverflow(self.buf.len()));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[tokio::test]
	async fn reads_two_newline_delimited_lines() {
		let mut reader = FramedLineReader::new(Cursor::new(b"one\ntwo\n".to_vec()));
		assert_eq!(reader.next_line().await.unwrap(), Some("one".to_string()));
		assert_eq!(reader.next_line().await.unwrap(), Some("two".to_string()));
		assert_eq!(reader.next_line().await.unwrap(), None);
	}

	#[tokio::test]
	async fn discards_a_partial_frame_on_clean_close() {
		let mut reader = FramedLineReader::new(Cursor::new(b"complete\npartial-no-newline".to_vec()));
		assert_eq!(reader.next_line().await.unwrap(), Some("complete".to_string()));
		assert_eq!(reader.next_line().await.unwrap(), None);
	}

	#[tokio::test]
	async fn accepts_a_line_at_exactly_the_cap() {
		let line = vec![b'x'; 16];
		let mut input = line.clone();
		input.push(b'\n');
		let mut reader = FramedLineReader::with_capacity(Cursor::new(input), 16);
		let got = reader.next_line().await.unwrap().unwrap();
		assert_eq!(got.len(), 16);
	}

	#[tokio::test]
	async fn drops_the_connection_one_byte_past_the_cap() {
		let mut input = vec![b'x'; 17];
		input.push(b'\n');
		let mut reader = FramedLineReader::with_capacity(Cursor::new(input), 16);
		let err = reader.next_line().await.unwrap_err();
		assert!(matches!(err, RouterError::BufferOverflow(_)));
	}
}
