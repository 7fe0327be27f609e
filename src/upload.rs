//! Upload intake: turns user supplied bytes into a displayable image.

use base64::Engine;
use base64::engine::general_purpose;
use image::ImageFormat;
use tracing::debug;

use crate::error::StudioError;

/// An encoded image held in memory, plus the mime type needed to show it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudioImage {
    /// Encoded bytes (JPEG, PNG, ...)
    pub bytes: Vec<u8>,
    /// Mime type matching `bytes`
    pub mime_type: String,
}

impl StudioImage {
    /// Wraps already-encoded bytes.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// `data:` URI suitable for an `<img src>`.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Size of the encoded payload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when there are no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Validates an uploaded file and works out its mime type from the content.
///
/// The browser's `accept="image/*"` filter is only a hint, so this checks for empty
/// input, oversized input and content that isn't an image we can decode.
pub fn intake(bytes: Vec<u8>, max_bytes: usize) -> Result<StudioImage, StudioError> {
    if bytes.is_empty() {
        return Err(StudioError::InvalidUpload(
            "The selected file is empty.".to_string(),
        ));
    }
    if bytes.len() > max_bytes {
        debug!("Upload of {} bytes is over the limit", bytes.len());
        return Err(StudioError::InvalidUpload(too_large_reason(max_bytes)));
    }

    let format = image::guess_format(&bytes).map_err(|err| {
        debug!("Failed to guess image format: {}", err);
        StudioError::InvalidUpload("The selected file is not an image.".to_string())
    })?;
    if !format.reading_enabled() {
        debug!("Unsupported image format {:?}", format);
        return Err(StudioError::InvalidUpload(format!(
            "{} images are not supported, please use JPEG or PNG.",
            format_label(format)
        )));
    }

    Ok(StudioImage::new(bytes, format.to_mime_type()))
}

/// Message shown when an upload goes over `max_bytes`.
pub fn too_large_reason(max_bytes: usize) -> String {
    format!("The selected file is too large, the limit is {max_bytes} bytes.")
}

fn format_label(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("These")
}
