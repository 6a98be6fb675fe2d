//! Photo gallery MCP tools.
//!
//! Captures go into the photo store; listing and clearing read and wipe it.

pub mod capture;
pub mod clear;
pub mod list;

pub use capture::{PhotoCaptureParams, capture_impl};
pub use clear::{PhotoClearOutput, clear_impl};
pub use list::{PhotoListOutput, PhotoListParams, list_impl};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shutter_core::PhotoRecord;

/// A stored photo as returned by the tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PhotoView {
    /// Store-assigned id.
    pub id: i64,
    /// RFC 3339 capture timestamp.
    pub captured_at: String,
    /// Length of the stored `data:` URL.
    pub payload_len: usize,
    /// The stored `data:` URL, when requested.
    pub payload: Option<String>,
}

impl PhotoView {
    pub fn new(record: PhotoRecord, include_payload: bool) -> Self {
        Self {
            id: record.id,
            captured_at: record.captured_at.to_rfc3339(),
            payload_len: record.payload.len(),
            payload: include_payload.then_some(record.payload),
        }
    }
}
