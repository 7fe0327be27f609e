//! Talks to the conversion backend.

use base64::Engine;
use base64::engine::general_purpose;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::StudioSettings;
use crate::constants::{CONVERT_PATH, DEFAULT_MIME_TYPE, HEALTH_PATH, IMAGE_FIELD, UPLOAD_FILE_NAME};
use crate::error::StudioError;
use crate::studio::state::BackendStatus;
use crate::upload::StudioImage;

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ConvertData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertData {
    #[serde(default)]
    image_data: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Appends `path` to the base URL, keeping any path prefix the base already has.
fn endpoint(base: &Url, path: &str) -> Result<Url, StudioError> {
    Ok(Url::parse(&format!(
        "{}{}",
        base.as_str().trim_end_matches('/'),
        path
    ))?)
}

/// HTTP client for the `/api` backend.
#[derive(Clone, Debug)]
pub struct ConvertClient {
    client: reqwest::Client,
    health_url: Url,
    convert_url: Url,
}

impl ConvertClient {
    /// Builds a client against `settings.api_base_url`.
    pub fn new(settings: &StudioSettings) -> Result<Self, StudioError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| StudioError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            client,
            health_url: endpoint(&settings.api_base_url, HEALTH_PATH)?,
            convert_url: endpoint(&settings.api_base_url, CONVERT_PATH)?,
        })
    }

    /// One-shot reachability probe, never fails.
    #[instrument(skip_all, fields(url = %self.health_url))]
    pub async fn health(&self) -> BackendStatus {
        match self.client.get(self.health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                info!("API reachable");
                BackendStatus::Reachable
            }
            Ok(response) => {
                warn!("API health check returned {}", response.status());
                BackendStatus::Unreachable
            }
            Err(err) => {
                warn!("API health check failed: {}", err);
                BackendStatus::Unreachable
            }
        }
    }

    /// Sends `image` to the backend and returns the converted picture.
    #[instrument(skip_all, fields(url = %self.convert_url, bytes = image.len()))]
    pub async fn convert_remote(&self, image: &StudioImage) -> Result<StudioImage, StudioError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(&image.mime_type)
            .map_err(|err| StudioError::InternalServerError(err.to_string()))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(self.convert_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.error)
                .and_then(|detail| detail.message)
                .unwrap_or_else(|| "API call failed".to_string());
            return Err(StudioError::RemoteStatus {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ConvertResponse = serde_json::from_slice(&body).map_err(|err| {
            debug!("Unparseable convert response: {}", String::from_utf8_lossy(&body));
            StudioError::MalformedResponse(format!("Failed to parse API response: {err}"))
        })?;
        let data = if parsed.success { parsed.data } else { None };
        let Some(ConvertData {
            image_data: Some(image_data),
            mime_type,
        }) = data
        else {
            return Err(StudioError::MalformedResponse(
                "No image data received from API".to_string(),
            ));
        };

        let bytes = general_purpose::STANDARD.decode(image_data.trim())?;
        if bytes.is_empty() {
            return Err(StudioError::MalformedResponse(
                "No image data received from API".to_string(),
            ));
        }
        let mime_type = mime_type
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        Ok(StudioImage::new(bytes, mime_type))
    }
}
