//! Picks between the remote conversion and the local fallback.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::client::ConvertClient;
use crate::error::StudioError;
use crate::studio::state::{Conversion, ConversionPath};
use crate::transform::fallback_convert;
use crate::upload::StudioImage;

/// Converts `image`, remote first.
///
/// A failing backend (transport error, non-2xx, unusable body) falls through to the
/// local tint after `fallback_delay`. Errors that happen before anything is sent, and a
/// failing fallback, are returned as is. The health probe isn't consulted: the remote
/// path is always attempted.
#[instrument(skip_all, fields(bytes = image.len()))]
pub async fn dispatch(
    client: &ConvertClient,
    image: &StudioImage,
    fallback_delay: Duration,
) -> Result<Conversion, StudioError> {
    let reason = match client.convert_remote(image).await {
        Ok(converted) => {
            info!("Remote conversion succeeded");
            return Ok(Conversion {
                image: converted,
                path: ConversionPath::Remote,
            });
        }
        Err(err) if err.is_remote() => {
            warn!("AI conversion error: {}", err);
            err.to_string()
        }
        Err(err) => return Err(err),
    };

    info!("Falling back to simulation");
    if !fallback_delay.is_zero() {
        tokio::time::sleep(fallback_delay).await;
    }
    let source = image.clone();
    let converted = tokio::task::spawn_blocking(move || fallback_convert(&source))
        .await
        .map_err(|err| StudioError::InternalServerError(err.to_string()))??;

    Ok(Conversion {
        image: converted,
        path: ConversionPath::Fallback { reason },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client_for, dead_backend, spawn_backend};
    use crate::upload::tests::sample_png;
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::json;

    fn photo() -> StudioImage {
        StudioImage::new(sample_png(4, 4, [100, 100, 100, 255]), "image/png")
    }

    #[tokio::test]
    async fn remote_path_wins_when_backend_works() {
        let router = Router::new().route(
            "/api/image/convert",
            post(|| async { Json(json!({"success": true, "data": {"imageData": "AQID"}})) }),
        );
        let client = client_for(&spawn_backend(router).await);
        let conversion = dispatch(&client, &photo(), Duration::ZERO)
            .await
            .expect("conversion");
        assert_eq!(conversion.path, ConversionPath::Remote);
        assert_eq!(conversion.image.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn server_error_falls_back_to_tint() {
        let router = Router::new().route(
            "/api/image/convert",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let client = client_for(&spawn_backend(router).await);
        let conversion = dispatch(&client, &photo(), Duration::ZERO)
            .await
            .expect("conversion");
        match &conversion.path {
            ConversionPath::Fallback { reason } => assert!(reason.contains("500")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(conversion.image.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn unreachable_backend_falls_back() {
        let client = client_for(&dead_backend().await);
        let conversion = dispatch(&client, &photo(), Duration::ZERO)
            .await
            .expect("conversion");
        assert!(matches!(conversion.path, ConversionPath::Fallback { .. }));
    }

    #[tokio::test]
    async fn local_request_error_skips_fallback() {
        let client = client_for(&dead_backend().await);
        let mislabelled = StudioImage::new(sample_png(4, 4, [1, 2, 3, 255]), "not a mime type");
        let err = dispatch(&client, &mislabelled, Duration::ZERO)
            .await
            .expect_err("request never built");
        assert!(!err.is_remote());
        assert!(matches!(err, StudioError::InternalServerError(_)));
    }

    #[tokio::test]
    async fn undecodable_photo_with_backend_down_is_an_error() {
        let client = client_for(&dead_backend().await);
        let broken = StudioImage::new(b"\x89PNG\r\n\x1a\ngarbage".to_vec(), "image/png");
        let err = dispatch(&client, &broken, Duration::ZERO)
            .await
            .expect_err("nothing to decode");
        assert!(matches!(err, StudioError::Image(_)));
    }
}
