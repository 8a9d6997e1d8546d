//! Media payloads exchanged with the generative provider
//!
//! A [`MediaInput`] keeps base64 image data and its mime type together so the
//! bytes are never sent under a different tag than the one they were read with.

use crate::fetch::FetchedResource;
use crate::{Error, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format tag applied whenever a payload's format cannot be determined.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Number of base64 characters decoded when sniffing an unprefixed payload.
const SNIFF_PREFIX_CHARS: usize = 16;

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
        .filter(|mime| mime.starts_with("image/"))
}

/// Detect the mime type of raw image bytes from their magic number.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    sniff_image_mime(bytes).unwrap_or_else(|| {
        tracing::warn!(
            "Unrecognized image format (first 4 bytes: {:02X?}), falling back to {}",
            &bytes[..bytes.len().min(4)],
            DEFAULT_IMAGE_MIME
        );
        DEFAULT_IMAGE_MIME
    })
}

/// Split a `data:image/<subtype>;base64,<data>` string into mime type and data.
/// The data part may be empty.
fn parse_data_uri(payload: &str) -> Option<(&str, &str)> {
    let rest = payload.strip_prefix("data:")?;
    let (mime, data) = rest.split_once(";base64,")?;
    let subtype = mime.strip_prefix("image/")?;

    let valid_subtype = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphabetic() || matches!(c, '+' | '.' | '-'));

    if valid_subtype {
        Some((mime, data))
    } else {
        None
    }
}

/// Determine the format tag of an encoded payload.
///
/// An explicit data-URI prefix wins. Unprefixed payloads are treated as raw
/// base64 and sniffed from their first few decoded bytes. Anything else gets
/// [`DEFAULT_IMAGE_MIME`]; this never fails.
pub fn detect_format(payload: &str) -> String {
    if let Some((mime, _)) = parse_data_uri(payload) {
        return mime.to_string();
    }

    let quantum = payload.len().min(SNIFF_PREFIX_CHARS) / 4 * 4;
    let sniffed = payload
        .get(..quantum)
        .and_then(|head| base64::engine::general_purpose::STANDARD.decode(head).ok())
        .and_then(|bytes| sniff_image_mime(&bytes));

    match sniffed {
        Some(mime) => mime.to_string(),
        None => {
            tracing::debug!(
                "No recognizable format on encoded payload, assuming {}",
                DEFAULT_IMAGE_MIME
            );
            DEFAULT_IMAGE_MIME.to_string()
        }
    }
}

/// Base64 image payload paired with its format tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInput {
    mime_type: String,
    data: String,
}

impl MediaInput {
    /// Pair already-encoded base64 data with a known mime type.
    pub fn from_parts(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parse a data URI or a raw base64 string.
    ///
    /// A `data:` payload that is not a base64 image URI yields an empty input
    /// rather than being reinterpreted as raw base64.
    pub fn from_encoded(payload: &str) -> Self {
        let payload = payload.trim();
        match parse_data_uri(payload) {
            Some((mime, data)) => Self::from_parts(mime, data),
            None if payload.starts_with("data:") => {
                tracing::warn!("Unsupported data URI, treating image as empty");
                Self::from_parts(DEFAULT_IMAGE_MIME, "")
            }
            None => Self::from_parts(detect_format(payload), payload),
        }
    }

    /// Encode raw image bytes, detecting their format from the magic number.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_parts(
            detect_image_mime(bytes),
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    /// Build from a fetched resource, preferring an `image/*` Content-Type.
    pub fn from_fetched(resource: &FetchedResource) -> Self {
        let declared = resource
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| ct.starts_with("image/"));

        match declared {
            Some(mime) => Self::from_parts(
                mime,
                base64::engine::general_purpose::STANDARD.encode(&resource.bytes),
            ),
            None => Self::from_bytes(&resource.bytes),
        }
    }

    /// Read an image file from disk.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Input(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without any data-URI prefix.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.trim().is_empty()
    }

    /// Embedded-data reference suitable for display.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| Error::Input(format!("Invalid base64 image data: {}", e)))
    }

    /// File extension matching the format tag.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// Product image as handed over by the catalog: inline data or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductImage {
    Url(String),
    Encoded(MediaInput),
}

impl ProductImage {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            ProductImage::Url(input.to_string())
        } else {
            ProductImage::Encoded(MediaInput::from_encoded(input))
        }
    }
}

impl From<MediaInput> for ProductImage {
    fn from(media: MediaInput) -> Self {
        ProductImage::Encoded(media)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_detect_png() {
        assert_eq!(detect_image_mime(PNG_BYTES), "image/png");
    }

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(detect_image_mime(JPEG_BYTES), "image/jpeg");
    }

    #[test]
    fn test_detect_webp() {
        assert_eq!(detect_image_mime(WEBP_BYTES), "image/webp");
    }

    #[test]
    fn test_unknown_bytes_fall_back_to_default() {
        assert_eq!(detect_image_mime(&[0x00, 0x01, 0x02, 0x03]), DEFAULT_IMAGE_MIME);
        assert_eq!(detect_image_mime(&[]), DEFAULT_IMAGE_MIME);
    }

    #[test]
    fn test_detect_format_uses_data_uri_prefix() {
        assert_eq!(detect_format("data:image/webp;base64,AAAA"), "image/webp");
        assert_eq!(detect_format("data:image/svg+xml;base64,PHN2Zz4="), "image/svg+xml");
    }

    #[test]
    fn test_detect_format_sniffs_raw_base64() {
        assert_eq!(detect_format(&b64(JPEG_BYTES)), "image/jpeg");
        assert_eq!(detect_format(&b64(PNG_BYTES)), "image/png");
    }

    #[test]
    fn test_detect_format_defaults_on_ambiguous_payload() {
        assert_eq!(detect_format("raw-bytes-no-prefix"), DEFAULT_IMAGE_MIME);
        assert_eq!(detect_format(""), DEFAULT_IMAGE_MIME);
        assert_eq!(detect_format("data:text/plain;base64,aGk="), DEFAULT_IMAGE_MIME);
    }

    #[test]
    fn test_from_encoded_strips_prefix_and_keeps_tag() {
        let media = MediaInput::from_encoded("data:image/jpeg;base64,/9j/4AAQ");
        assert_eq!(media.mime_type(), "image/jpeg");
        assert_eq!(media.data(), "/9j/4AAQ");
        assert_eq!(media.to_data_uri(), "data:image/jpeg;base64,/9j/4AAQ");
    }

    #[test]
    fn test_from_encoded_empty_data_uri_is_empty() {
        let media = MediaInput::from_encoded("data:image/jpeg;base64,");
        assert!(media.is_empty());
        assert_eq!(media.mime_type(), "image/jpeg");
        assert_eq!(media.data(), "");
    }

    #[test]
    fn test_from_encoded_non_image_data_uri_is_empty() {
        let media = MediaInput::from_encoded("data:text/plain;base64,aGk=");
        assert!(media.is_empty());
        assert!(!media.data().starts_with("data:"));
    }

    #[test]
    fn test_from_encoded_raw_payload_keeps_data_verbatim() {
        let media = MediaInput::from_encoded("raw-bytes-no-prefix");
        assert_eq!(media.mime_type(), DEFAULT_IMAGE_MIME);
        assert_eq!(media.data(), "raw-bytes-no-prefix");
    }

    #[test]
    fn test_from_bytes_detects_and_decodes() {
        let media = MediaInput::from_bytes(JPEG_BYTES);
        assert_eq!(media.mime_type(), "image/jpeg");
        assert_eq!(media.decode().unwrap(), JPEG_BYTES);
        assert_eq!(media.extension(), "jpg");
    }

    #[test]
    fn test_from_fetched_prefers_image_content_type() {
        let resource = FetchedResource {
            bytes: JPEG_BYTES.to_vec(),
            content_type: Some("image/png; charset=binary".to_string()),
        };
        assert_eq!(MediaInput::from_fetched(&resource).mime_type(), "image/png");

        let untyped = FetchedResource {
            bytes: JPEG_BYTES.to_vec(),
            content_type: Some("application/octet-stream".to_string()),
        };
        assert_eq!(MediaInput::from_fetched(&untyped).mime_type(), "image/jpeg");
    }

    #[test]
    fn test_product_image_parse() {
        assert_eq!(
            ProductImage::parse("https://example.com/shirt.png"),
            ProductImage::Url("https://example.com/shirt.png".to_string())
        );
        assert!(matches!(
            ProductImage::parse("data:image/png;base64,iVBORw0KGgo="),
            ProductImage::Encoded(_)
        ));
    }

    #[tokio::test]
    async fn test_from_file_missing_path_is_input_error() {
        let err = MediaInput::from_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
