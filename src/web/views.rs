use super::flash::{FlashMessage, flash_messages};
use super::prelude::*;
use crate::constants::{DEFAULT_MIME_TYPE, DOWNLOAD_FILE_NAME, IMAGE_FIELD, PENDING_REFRESH_SECONDS};
use crate::studio::state::{BackendStatus, SessionState};
use crate::upload::{intake, too_large_reason};
use axum::extract::Multipart;
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION};

#[derive(Template, WebTemplate)]
#[template(path = "studio.html")]
pub(crate) struct StudioTemplate {
    pub(crate) backend_label: &'static str,
    pub(crate) backend_class: &'static str,
    pub(crate) flashes: Vec<FlashMessage>,
    pub(crate) original_uri: Option<String>,
    pub(crate) converted_uri: Option<String>,
    pub(crate) picker_selection: Option<String>,
    pub(crate) show_ad_section: bool,
    pub(crate) ad_playing: bool,
    pub(crate) ad_seconds: u64,
    pub(crate) show_convert_section: bool,
    pub(crate) processing: bool,
    pub(crate) refresh_seconds: Option<u32>,
}

impl StudioTemplate {
    fn new(state: &SessionState, flashes: Vec<FlashMessage>, ad_seconds: u64) -> Self {
        let (backend_label, backend_class) = match state.backend {
            BackendStatus::Unknown => ("🔄 Checking API connection...", "checking"),
            BackendStatus::Reachable => ("✅ API connected", "connected"),
            BackendStatus::Unreachable => ("❌ API connection failed", "error"),
        };
        let has_original = state.original.is_some();
        Self {
            backend_label,
            backend_class,
            flashes,
            original_uri: state.original.as_ref().map(|image| image.data_uri()),
            converted_uri: state.converted.as_ref().map(|image| image.data_uri()),
            picker_selection: state.picker_selection.clone(),
            show_ad_section: has_original && !state.ad_gate_open(),
            ad_playing: state.ad_modal_visible(),
            ad_seconds,
            show_convert_section: has_original
                && state.ad_gate_open()
                && state.converted.is_none(),
            processing: state.processing,
            refresh_seconds: state.is_pending().then_some(PENDING_REFRESH_SECONDS),
        }
    }
}

/// handles the / GET
pub(crate) async fn studio_handler(State(state): State<AppState>) -> Response {
    let mut studio = state.studio.lock().await;
    let notices = studio.take_notices();
    let ad_seconds = studio.settings().ad_duration.as_secs().max(1);
    let template = StudioTemplate::new(studio.state(), flash_messages(&notices), ad_seconds);
    drop(studio);

    let mut response = template.into_response();
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Reads the picked file out of the form and feeds it to the studio.
pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Redirect {
    let max_bytes = state.studio.lock().await.settings().max_upload_bytes;
    let event = match read_upload(&mut multipart).await {
        Ok(Some((file_name, bytes))) => match intake(bytes, max_bytes) {
            Ok(image) => {
                info!(
                    "Accepted upload {:?} ({} bytes, {})",
                    file_name,
                    image.len(),
                    image.mime_type
                );
                Event::Uploaded { file_name, image }
            }
            Err(err) => Event::UploadFailed(err.to_string()),
        },
        Ok(None) => Event::UploadFailed("No file was selected.".to_string()),
        Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            debug!("Upload body over the limit: {}", err);
            Event::UploadFailed(too_large_reason(max_bytes))
        }
        Err(err) => {
            debug!("Failed to read upload: {}", err);
            Event::UploadFailed(format!("Couldn't read the selected file: {err}"))
        }
    };
    state.studio.lock().await.handle(event);
    Redirect::to("/")
}

async fn read_upload(
    multipart: &mut Multipart,
) -> Result<Option<(Option<String>, Vec<u8>)>, axum::extract::multipart::MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty());
        let bytes = field.bytes().await?;
        return Ok(Some((file_name, bytes.to_vec())));
    }
    Ok(None)
}

pub(crate) async fn watch_ad_handler(State(state): State<AppState>) -> Redirect {
    state.studio.lock().await.handle(Event::AdRequested);
    Redirect::to("/")
}

pub(crate) async fn convert_handler(State(state): State<AppState>) -> Redirect {
    state.studio.lock().await.handle(Event::ConvertRequested);
    Redirect::to("/")
}

pub(crate) async fn reset_handler(State(state): State<AppState>) -> Redirect {
    state.studio.lock().await.handle(Event::Reset);
    Redirect::to("/")
}

/// Offers the converted picture as a download, or goes back to the studio if there isn't one.
pub(crate) async fn download_handler(
    State(state): State<AppState>,
) -> Result<Response, StudioError> {
    let download = state
        .studio
        .lock()
        .await
        .handle(Event::DownloadRequested)
        .into_iter()
        .next();
    let Some(download) = download else {
        debug!("Nothing to download yet");
        return Ok(Redirect::to("/").into_response());
    };

    let disposition = format!("attachment; filename=\"{}\"", download.file_name);
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, DEFAULT_MIME_TYPE)
        .header(CONTENT_DISPOSITION, disposition)
        .body(axum::body::Body::from(download.image.bytes))?;
    debug!("Serving {}", DOWNLOAD_FILE_NAME);
    Ok(response)
}
