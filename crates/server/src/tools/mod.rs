//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shutter server.

pub mod assets;
pub mod photos;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shutter_core::Error;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use serde::de::DeserializeOwned;
    use shutter_client::{AppContext, FetchConfig, HttpNetwork};
    use shutter_core::{AppConfig, CacheStorage, PhotoStore};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    /// In-memory context whose origin refuses connections, so nothing is installed.
    pub async fn offline_context() -> AppContext {
        let config = AppConfig { origin: "http://127.0.0.1:9/".into(), ..Default::default() };
        let photos = PhotoStore::open_in_memory(config.schema_version).await.unwrap();
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let network =
            Arc::new(HttpNetwork::new(FetchConfig { timeout: Duration::from_secs(2), ..Default::default() }).unwrap());
        AppContext::with_parts(config, photos, storage, network).await.unwrap()
    }

    pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
