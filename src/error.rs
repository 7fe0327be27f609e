//! Error handling

use axum::response::IntoResponse;
use tracing::error;

/// Errors raised by the studio.
#[derive(Debug)]
pub enum StudioError {
    /// The uploaded file was rejected, with a reason for the user
    InvalidUpload(String),
    /// Configuration didn't make sense
    InvalidConfig(String),
    /// The backend couldn't be reached at all
    RemoteUnavailable(String),
    /// The backend answered with a non-success status
    RemoteStatus {
        /// HTTP status code
        status: u16,
        /// Message from the error body, or a generic one
        message: String,
    },
    /// The backend said OK but the body wasn't usable
    MalformedResponse(String),
    /// Decoding or encoding an image failed
    Image(image::ImageError),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl StudioError {
    /// Failures of the backend call itself, the local fallback can stand in for these.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::RemoteStatus { .. } | Self::MalformedResponse(_)
        )
    }
}

impl std::fmt::Display for StudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUpload(reason) => write!(f, "{reason}"),
            Self::InvalidConfig(reason) => write!(f, "Invalid configuration: {reason}"),
            Self::RemoteUnavailable(reason) => write!(f, "API unreachable: {reason}"),
            Self::RemoteStatus { status, message } => write!(f, "{message} (HTTP {status})"),
            Self::MalformedResponse(reason) => write!(f, "{reason}"),
            Self::Image(err) => write!(f, "Image processing failed: {err}"),
            Self::InternalServerError(message) => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for StudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StudioError::MalformedResponse(err.to_string())
        } else {
            StudioError::RemoteUnavailable(err.to_string())
        }
    }
}

impl From<image::ImageError> for StudioError {
    fn from(err: image::ImageError) -> Self {
        StudioError::Image(err)
    }
}

impl From<base64::DecodeError> for StudioError {
    fn from(err: base64::DecodeError) -> Self {
        StudioError::MalformedResponse(format!("Image data was not valid base64: {err}"))
    }
}

impl From<url::ParseError> for StudioError {
    fn from(err: url::ParseError) -> Self {
        StudioError::InvalidConfig(err.to_string())
    }
}

impl From<std::io::Error> for StudioError {
    fn from(err: std::io::Error) -> Self {
        StudioError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for StudioError {
    fn from(err: axum::http::Error) -> Self {
        StudioError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for StudioError {
    fn into_response(self) -> axum::response::Response {
        error!("Internal server error: {}", self);
        let mut response =
            axum::response::Response::new(axum::body::Body::from("Internal server error"));
        *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
        response
    }
}
