//! photo_capture tool implementation.
//!
//! Validates an encoded snapshot and appends it to the photo store.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shutter_core::{CapturePayload, Error, PhotoStore, capture::DEFAULT_MIME_TYPE};

use super::PhotoView;
use crate::tools::json_result;

/// Parameters for the photo_capture tool.
///
/// Exactly one of `data_url` or `image_base64` must be given.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PhotoCaptureParams {
    /// A `data:image/*;base64,...` URL.
    #[serde(default)]
    pub data_url: Option<String>,

    /// Raw base64 image bytes.
    #[serde(default)]
    pub image_base64: Option<String>,

    /// MIME type of `image_base64` (default: image/png).
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.into()
}

impl PhotoCaptureParams {
    fn into_payload(self) -> Result<CapturePayload, Error> {
        match (self.data_url, self.image_base64) {
            (Some(data_url), None) => CapturePayload::from_data_url(&data_url),
            (None, Some(encoded)) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| Error::InvalidInput(format!("invalid base64 image: {e}")))?;
                CapturePayload::new(self.mime_type, bytes)
            }
            _ => Err(Error::InvalidInput("exactly one of data_url or image_base64 is required".into())),
        }
    }
}

/// Implementation of the photo_capture tool.
pub async fn capture_impl(photos: &PhotoStore, params: PhotoCaptureParams) -> Result<CallToolResult, McpError> {
    let payload = params.into_payload()?;
    let record = photos.append(&payload.to_data_url()).await?;
    tracing::info!(id = record.id, mime_type = payload.mime_type(), bytes = payload.bytes().len(), "photo captured");

    json_result(&PhotoView::new(record, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::output;

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn params(data_url: Option<&str>, image_base64: Option<&str>) -> PhotoCaptureParams {
        PhotoCaptureParams {
            data_url: data_url.map(String::from),
            image_base64: image_base64.map(String::from),
            mime_type: default_mime_type(),
        }
    }

    #[tokio::test]
    async fn test_capture_data_url() {
        let photos = PhotoStore::open_in_memory(shutter_core::store::SCHEMA_VERSION).await.unwrap();

        let result = capture_impl(&photos, params(Some(PNG_DATA_URL), None)).await.unwrap();
        let view: PhotoView = output(&result);

        let stored = photos.get(view.id).await.unwrap().unwrap();
        assert_eq!(stored.payload, PNG_DATA_URL);
        assert!(view.payload.is_none());
    }

    #[tokio::test]
    async fn test_capture_raw_base64() {
        let photos = PhotoStore::open_in_memory(shutter_core::store::SCHEMA_VERSION).await.unwrap();

        capture_impl(&photos, params(None, Some("iVBORw0KGgo="))).await.unwrap();

        let records = photos.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, PNG_DATA_URL);
    }

    #[tokio::test]
    async fn test_capture_rejects_ambiguous_or_missing_input() {
        let photos = PhotoStore::open_in_memory(shutter_core::store::SCHEMA_VERSION).await.unwrap();

        assert!(capture_impl(&photos, params(None, None)).await.is_err());
        assert!(capture_impl(&photos, params(Some(PNG_DATA_URL), Some("iVBORw0KGgo="))).await.is_err());
        assert!(capture_impl(&photos, params(Some("data:text/plain;base64,aGk="), None)).await.is_err());
        assert_eq!(photos.count().await.unwrap(), 0);
    }
}
