//! photo_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shutter_core::PhotoStore;

use super::PhotoView;
use crate::tools::json_result;

/// Parameters for the photo_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PhotoListParams {
    /// Include each photo's `data:` URL (default: false).
    #[serde(default)]
    pub include_payload: bool,
}

/// Output from the photo_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PhotoListOutput {
    pub count: usize,
    /// Photos in capture order.
    pub photos: Vec<PhotoView>,
}

/// Implementation of the photo_list tool.
pub async fn list_impl(photos: &PhotoStore, params: PhotoListParams) -> Result<CallToolResult, McpError> {
    let records = photos.list_all().await?;
    let photos: Vec<PhotoView> = records
        .into_iter()
        .map(|record| PhotoView::new(record, params.include_payload))
        .collect();

    json_result(&PhotoListOutput { count: photos.len(), photos })
}
