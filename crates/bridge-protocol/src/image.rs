//! Detects screenshot-like results so the Helper can re-wrap them as MCP
//! image content (spec §4.4: "A screenshot-like result, recognizable by
//! containing an encoded image blob, is re-wrapped into MCP's image
//! content form; all other results are stringified JSON.").
//!
//! The action executor is opaque (out of scope per spec §1), so this is
//! a best-effort structural sniff of its result `Value`, not a typed
//! contract with it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

/// A recognized image payload extracted from an opaque action result.
pub struct ImageBlob {
	pub base64_data: String,
	pub mime_type: String,
}

/// Looks for `{"image": {"data": "<base64>", "mimeType": "image/..."}}`
/// or the flatter `{"data": "<base64>", "mimeType": "image/..."}` shape,
/// validating that `data` actually decodes as base64 before accepting it.
pub fn extract_image_blob(result: &Value) -> Option<ImageBlob> {
	let candidate = result.get("image").unwrap_or(result);

	let data = candidate.get("data")?.as_str()?;
	let mime_type = candidate.get("mime_type").or_else(|| candidate.get("mimeType")).and_then(Value::as_str).unwrap_or("image/png");

	if !mime_type.starts_with("image/") {
		return None;
	}
	BASE64.decode(data).ok()?;

	Some(ImageBlob {
		base64_data: data.to_string(),
		mime_type: mime_type.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn recognizes_nested_image_shape() {
		let result = json!({"image": {"data": "aGVsbG8=", "mimeType": "image/png"}});
		let blob = extract_image_blob(&result).expect("should recognize image");
		assert_eq!(blob.mime_type, "image/png");
	}

	#[test]
	fn recognizes_flat_shape_with_snake_case_mime_field() {
		let result = json!({"data": "aGVsbG8=", "mime_type": "image/jpeg"});
		let blob = extract_image_blob(&result).expect("should recognize image");
		assert_eq!(blob.mime_type, "image/jpeg");
	}

	#[test]
	fn rejects_non_image_results() {
		let result = json!({"title": "Example", "url": "https://example.com"});
		assert!(extract_image_blob(&result).is_none());
	}

	#[test]
	fn rejects_invalid_base64() {
		let result = json!({"data": "not base64!!", "mimeType": "image/png"});
		assert!(extract_image_blob(&result).is_none());
	}
}
