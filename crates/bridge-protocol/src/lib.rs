//! Wire types for the browser MCP bridge: the newline-JSON envelope
//! (§3, §4.1), the fixed action vocabulary (§6), and the screenshot-blob
//! sniff the Helper uses to build MCP image content (§4.4).
//!
//! Deliberately free of `tokio`: both the native router (`bridge-core`,
//! `bridge-cli`) and the WASM side panel (`bridge-sidepanel`) depend on
//! this crate, and the side panel cannot carry an async runtime dependency.

pub mod action;
pub mod codec;
pub mod image;
mod messages;

pub use action::{Action, ACTION_CATALOG, ActionSpec, all_actions};
pub use codec::MAX_FRAME_BYTES;
pub use image::{ImageBlob, extract_image_blob};
pub use messages::Message;
