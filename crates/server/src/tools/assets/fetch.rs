//! asset_fetch tool implementation.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shutter_client::{AssetCacheManager, AssetRequest, AssetResponse, Method, ResponseSource};
use shutter_core::Error;
use url::Url;

use crate::tools::json_result;

/// Parameters for the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is answered from the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers forwarded to the network. Not part of the cache key.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// "basic" (same origin) or "cors".
    pub response_type: String,
    /// "cache", "network" or "network_stored".
    pub source: String,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body as UTF-8 text, when it is valid UTF-8.
    pub body_text: Option<String>,
    /// Body as base64, when it is not valid UTF-8.
    pub body_base64: Option<String>,
}

impl From<AssetResponse> for AssetFetchOutput {
    fn from(response: AssetResponse) -> Self {
        let content_type = response.header("content-type").map(String::from);
        let (body_text, body_base64) = match std::str::from_utf8(&response.body) {
            Ok(text) => (Some(text.to_string()), None),
            Err(_) => (None, Some(STANDARD.encode(&response.body))),
        };
        let source = match response.source {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::NetworkStored => "network_stored",
        };

        Self {
            url: response.url,
            status: response.status,
            status_text: response.status_text,
            response_type: response.response_type.as_str().to_string(),
            source: source.to_string(),
            content_type,
            headers: response.headers,
            body_text,
            body_base64,
        }
    }
}

/// Implementation of the asset_fetch tool.
pub async fn fetch_impl(assets: &AssetCacheManager, params: AssetFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = build_request(assets.origin(), params)?;
    let response = assets.handle_request(&request).await?;
    json_result(&AssetFetchOutput::from(response))
}

fn build_request(origin: &Url, params: AssetFetchParams) -> Result<AssetRequest, Error> {
    let method = reqwest_method(&params.method)?;
    let request = AssetRequest::resolve(method, origin, &params.url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;

    Ok(params
        .headers
        .into_iter()
        .fold(request, |request, (name, value)| request.with_header(name, value)))
}

fn reqwest_method(method: &str) -> Result<Method, Error> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_context;
    use shutter_core::ResponseType;

    fn response(body: &[u8]) -> AssetResponse {
        AssetResponse {
            url: "http://localhost:8080/icon-192.png".into(),
            status: 200,
            status_text: "OK".into(),
            response_type: ResponseType::Basic,
            headers: vec![("Content-Type".into(), "image/png".into())],
            body: body.to_vec().into(),
            source: ResponseSource::NetworkStored,
        }
    }

    #[test]
    fn test_output_binary_body_is_base64() {
        let output = AssetFetchOutput::from(response(&[0x89, b'P', b'N', b'G', 0xff]));
        assert_eq!(output.body_text, None);
        assert_eq!(output.body_base64.as_deref(), Some("iVBOR/8="));
        assert_eq!(output.content_type.as_deref(), Some("image/png"));
        assert_eq!(output.source, "network_stored");
        assert_eq!(output.response_type, "basic");
    }

    #[test]
    fn test_output_text_body() {
        let output = AssetFetchOutput::from(response(b"<html></html>"));
        assert_eq!(output.body_text.as_deref(), Some("<html></html>"));
        assert_eq!(output.body_base64, None);
    }

    #[test]
    fn test_build_request_forwards_headers() {
        let origin = Url::parse("http://localhost:8080/").unwrap();
        let params = AssetFetchParams {
            url: "manifest.json".into(),
            method: "get".into(),
            headers: BTreeMap::from([("accept".to_string(), "application/json".to_string())]),
        };

        let request = build_request(&origin, params).unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/manifest.json");
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.headers(), &[("accept".to_string(), "application/json".to_string())]);
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let ctx = offline_context().await;
        let params = AssetFetchParams { url: "  ".into(), method: default_method(), headers: BTreeMap::new() };
        assert!(fetch_impl(&ctx.assets, params).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_invalid_method() {
        let ctx = offline_context().await;
        let params = AssetFetchParams { url: "index.html".into(), method: "NOT A METHOD".into(), headers: BTreeMap::new() };
        let err = fetch_impl(&ctx.assets, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_fetch_offline_without_cache() {
        let ctx = offline_context().await;
        let params = AssetFetchParams { url: "index.html".into(), method: default_method(), headers: BTreeMap::new() };
        let err = fetch_impl(&ctx.assets, params).await.unwrap_err();
        assert_eq!(err.code.0, -32005);
    }
}
