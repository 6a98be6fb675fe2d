//! Capture payload contract.
//!
//! A snapshot of the camera frame reaches the photo store as an encoded
//! image wrapped in a `data:` URL, e.g. `data:image/png;base64,iVBOR...`.
//! The string is self-describing, so the store never needs to know the format.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Default MIME type for snapshots.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Which camera the capture session asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera.
    Environment,
    /// Front camera.
    User,
}

/// Media constraints requested when the capture session opens the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self { facing_mode: FacingMode::Environment, ideal_width: 320, ideal_height: 240 }
    }
}

/// An encoded snapshot ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePayload {
    mime_type: String,
    bytes: Vec<u8>,
}

impl CapturePayload {
    /// Wrap encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the bytes are empty or the MIME type is not `image/*`.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Error> {
        let mime_type = mime_type.into().to_ascii_lowercase();
        if !is_image_mime(&mime_type) {
            return Err(Error::InvalidInput(format!("not an image type: {mime_type}")));
        }
        if bytes.is_empty() {
            return Err(Error::InvalidInput("empty image".into()));
        }
        Ok(Self { mime_type, bytes })
    }

    /// Wrap PNG bytes.
    pub fn png(bytes: Vec<u8>) -> Result<Self, Error> {
        Self::new(DEFAULT_MIME_TYPE, bytes)
    }

    /// Parse a `data:image/*;base64,` URL.
    pub fn from_data_url(data_url: &str) -> Result<Self, Error> {
        let rest = data_url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidInput("payload must be a data: URL".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidInput("data: URL has no payload".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidInput("data: URL must be base64 encoded".into()))?;

        let bytes = STANDARD
            .decode(data)
            .map_err(|e| Error::InvalidInput(format!("invalid base64 payload: {e}")))?;

        Self::new(mime_type, bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Render as the `data:` URL stored in a photo record.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .strip_prefix("image/")
        .is_some_and(|sub| !sub.is_empty() && !sub.contains(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn test_png_data_url() {
        let payload = CapturePayload::png(PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(payload.to_data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_parse_data_url() {
        let payload = CapturePayload::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(payload.mime_type(), "image/png");
        assert_eq!(payload.bytes(), PNG_MAGIC);
    }

    #[test]
    fn test_parse_jpeg() {
        let payload = CapturePayload::from_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(payload.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_reject_non_data_url() {
        let result = CapturePayload::from_data_url("https://example.com/a.png");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_reject_non_image() {
        let result = CapturePayload::from_data_url("data:text/plain;base64,aGVsbG8=");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_reject_plain_encoding() {
        let result = CapturePayload::from_data_url("data:image/svg+xml,<svg/>");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_reject_bad_base64() {
        let result = CapturePayload::from_data_url("data:image/png;base64,***");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_reject_empty_image() {
        assert!(CapturePayload::png(Vec::new()).is_err());
        assert!(CapturePayload::from_data_url("data:image/png;base64,").is_err());
    }

    #[test]
    fn test_default_constraints() {
        let constraints = CaptureConstraints::default();
        assert_eq!(constraints.facing_mode, FacingMode::Environment);
        assert_eq!((constraints.ideal_width, constraints.ideal_height), (320, 240));
    }
}
