//! cache_status tool implementation.
//!
//! Reports the current cache generation and every generation on disk.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shutter_client::AssetCacheManager;

use crate::tools::json_result;

/// One stored cache generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationView {
    pub name: String,
    pub created_at: String,
    /// Asset paths installed with this generation.
    pub asset_set: Vec<String>,
    pub entries: u64,
    /// Whether this generation is answering requests.
    pub current: bool,
}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub origin: String,
    /// Name of the generation serving requests, if any.
    pub current: Option<String>,
    /// Stored generations, oldest first.
    pub generations: Vec<GenerationView>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(assets: &AssetCacheManager) -> Result<CallToolResult, McpError> {
    let current = assets.current_generation().await;
    let generations = assets
        .generations()
        .await?
        .into_iter()
        .map(|info| GenerationView {
            current: current.as_deref() == Some(info.name.as_str()),
            name: info.name,
            created_at: info.created_at,
            asset_set: info.asset_set,
            entries: info.entries,
        })
        .collect();

    json_result(&CacheStatusOutput { origin: assets.origin().to_string(), current, generations })
}
