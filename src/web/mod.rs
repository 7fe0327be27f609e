//! The browser-facing side: one page plus a handful of form posts.

use std::num::NonZeroU16;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::StudioSettings;
use crate::studio::{SharedStudio, Studio, run};

mod flash;
mod prelude;
mod views;

use views::{
    convert_handler, download_handler, reset_handler, studio_handler, upload_handler,
    watch_ad_handler,
};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    studio: SharedStudio,
}

impl AppState {
    fn new(studio: SharedStudio) -> Self {
        Self { studio }
    }
}

fn create_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(studio_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route("/upload", axum::routing::post(upload_handler))
        .route("/ad", axum::routing::post(watch_ad_handler))
        .route("/convert", axum::routing::post(convert_handler))
        .route("/download", axum::routing::get(download_handler))
        .route("/reset", axum::routing::post(reset_handler))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

/// Builds the studio, starts its event loop and health probe, and returns the app.
fn build_app(settings: StudioSettings) -> Result<Router, crate::error::StudioError> {
    let max_upload_bytes = settings.max_upload_bytes;
    let (studio, receiver) = Studio::new(settings)?;
    studio.mount();
    let studio: SharedStudio = Arc::new(Mutex::new(studio));
    tokio::spawn(run(studio.clone(), receiver));
    Ok(create_router(max_upload_bytes).with_state(AppState::new(studio)))
}

/// Serves the studio until ctrl-c.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    settings: StudioSettings,
) -> Result<(), anyhow::Error> {
    info!("Using conversion API at {}", settings.api_base_url);
    let app = build_app(settings)?;

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::tests::{dead_backend, spawn_backend};
    use crate::upload::tests::sample_png;
    use axum::Json;
    use axum::body::Body;
    use axum::http::header::{CONTENT_DISPOSITION, LOCATION};
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "catstudioboundary";

    fn test_settings(base: &str) -> StudioSettings {
        let mut settings = StudioSettings::new(base).expect("settings");
        settings.ad_duration = Duration::from_millis(20);
        settings.fallback_delay = Duration::ZERO;
        settings
    }

    async fn test_app(base: &str) -> Router {
        build_app(test_settings(base)).expect("app")
    }

    fn raw_upload(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
        raw_upload(multipart_body(file_name, bytes))
    }

    fn post_to(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn read_body(response: axum::response::Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec()
    }

    async fn page(app: &Router) -> String {
        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        String::from_utf8_lossy(&read_body(response).await).to_string()
    }

    /// Polls the page until `needle` shows up.
    async fn wait_for(app: &Router, needle: &str) -> String {
        for _ in 0..200 {
            let body = page(app).await;
            if body.contains(needle) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{needle} never appeared");
    }

    #[tokio::test]
    async fn empty_studio_renders_upload_form() {
        let app = test_app(&dead_backend().await).await;
        let body = page(&app).await;
        assert!(body.contains("AI Cat Photo Studio"));
        assert!(body.contains("action=\"/upload\""));
        assert!(!body.contains("action=\"/ad\""));
    }

    #[tokio::test]
    async fn styles_are_served() {
        let app = test_app(&dead_backend().await).await;
        let response = app.oneshot(get("/static/styles.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/css");
    }

    #[tokio::test]
    async fn upload_shows_photo_and_ad_button() {
        let app = test_app(&dead_backend().await).await;
        let png = sample_png(2, 2, [1, 2, 3, 255]);
        let response = app
            .clone()
            .oneshot(upload_request("kitten.png", &png))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");

        let body = page(&app).await;
        assert!(body.contains("base64,iVBOR"));
        assert!(body.contains("kitten.png"));
        assert!(body.contains("action=\"/ad\""));
        assert!(!body.contains("action=\"/convert\""));
    }

    #[tokio::test]
    async fn bad_upload_shows_notice_once() {
        let app = test_app(&dead_backend().await).await;
        let response = app
            .clone()
            .oneshot(upload_request("notes.txt", b"just some text"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let body = page(&app).await;
        assert!(body.contains("not an image"));
        let body = page(&app).await;
        assert!(!body.contains("not an image"));
    }

    #[tokio::test]
    async fn slow_health_check_does_not_refresh_upload_page() {
        let router = axum::Router::new().route(
            "/api/health",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "ok"
            }),
        );
        let app = build_app(StudioSettings::new(&spawn_backend(router).await).expect("settings"))
            .expect("app");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let body = page(&app).await;
        assert!(body.contains("Checking API connection"));
        assert!(body.contains("action=\"/upload\""));
        assert!(!body.contains("http-equiv=\"refresh\""));
    }

    #[tokio::test]
    async fn form_without_image_field_shows_notice() {
        let app = test_app(&dead_backend().await).await;
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
        );
        let response = app
            .clone()
            .oneshot(raw_upload(body.into_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");

        let body = page(&app).await;
        assert!(body.contains("toast error"));
        assert!(body.contains("No file was selected."));
    }

    #[tokio::test]
    async fn truncated_upload_shows_read_error() {
        let app = test_app(&dead_backend().await).await;
        let mut body = multipart_body("a.png", &sample_png(2, 2, [1, 2, 3, 255]));
        // chop off the closing boundary
        body.truncate(body.len() - BOUNDARY.len() - 8);
        let response = app.clone().oneshot(raw_upload(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let body = page(&app).await;
        assert!(body.contains("toast error"));
        assert!(body.contains("read the selected file"));
        assert!(!body.contains("base64,"));
    }

    #[tokio::test]
    async fn oversized_body_shows_too_large_notice() {
        let mut settings = test_settings(&dead_backend().await);
        settings.max_upload_bytes = 1000;
        let app = build_app(settings).expect("app");

        let response = app
            .clone()
            .oneshot(upload_request("big.png", &vec![0u8; 200 * 1024]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let body = page(&app).await;
        assert!(body.contains("toast error"));
        assert!(body.contains("too large, the limit is 1000 bytes"));
        assert!(!body.contains("Error parsing"));
    }

    #[tokio::test]
    async fn convert_before_ad_is_ignored() {
        let app = test_app(&dead_backend().await).await;
        let png = sample_png(2, 2, [1, 2, 3, 255]);
        app.clone()
            .oneshot(upload_request("a.png", &png))
            .await
            .unwrap();
        let response = app.clone().oneshot(post_to("/convert")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let body = page(&app).await;
        assert!(!body.contains("Conversion complete"));
        assert!(!body.contains("converting your photo"));
    }

    #[tokio::test]
    async fn download_without_result_redirects() {
        let app = test_app(&dead_backend().await).await;
        let response = app.oneshot(get("/download")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn full_flow_with_remote_backend() {
        let router = axum::Router::new().route(
            "/api/image/convert",
            post(|| async {
                Json(json!({"success": true, "data": {"imageData": "/9j/4AAQ", "mimeType": "image/jpeg"}}))
            }),
        );
        let app = test_app(&spawn_backend(router).await).await;
        let png = sample_png(2, 2, [1, 2, 3, 255]);
        app.clone()
            .oneshot(upload_request("a.png", &png))
            .await
            .unwrap();
        app.clone().oneshot(post_to("/ad")).await.unwrap();
        wait_for(&app, "action=\"/convert\"").await;

        app.clone().oneshot(post_to("/convert")).await.unwrap();
        let body = wait_for(&app, "Conversion complete").await;
        assert!(body.contains("data:image"));
        assert!(body.contains("4AAQ"));

        let response = app.clone().oneshot(get("/download")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"cat-converted-photo.jpg\""
        );
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/jpeg");
        assert_eq!(read_body(response).await, vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]);

        let response = app.clone().oneshot(post_to("/reset")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let body = page(&app).await;
        assert!(!body.contains("data:image"));
        assert!(!body.contains("a.png"));
    }
}
