//! photo_clear tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shutter_core::PhotoStore;

use crate::tools::json_result;

/// Output from the photo_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PhotoClearOutput {
    /// Number of photos deleted.
    pub removed: u64,
}

/// Implementation of the photo_clear tool.
pub async fn clear_impl(photos: &PhotoStore) -> Result<CallToolResult, McpError> {
    let removed = photos.clear().await?;
    tracing::info!(removed, "gallery cleared");
    json_result(&PhotoClearOutput { removed })
}
