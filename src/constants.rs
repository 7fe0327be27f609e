//! Shared constants for the studio
//!

use std::time::Duration;

/// Health endpoint, relative to the API base URL
pub const HEALTH_PATH: &str = "/api/health";

/// Conversion endpoint, relative to the API base URL
pub const CONVERT_PATH: &str = "/api/image/convert";

/// Multipart field carrying the image, both for uploads and the backend call
pub const IMAGE_FIELD: &str = "image";

/// File name attached to the image part sent to the backend
pub const UPLOAD_FILE_NAME: &str = "uploaded-image.jpg";

/// Mime type assumed when the backend doesn't say
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// The name the converted picture is saved as
pub const DOWNLOAD_FILE_NAME: &str = "cat-converted-photo.jpg";

/// Default API base URL when none is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// How long the simulated ad plays before the gate opens
pub const AD_DURATION: Duration = Duration::from_millis(3000);

/// Pause before the local fallback kicks in, mimics "thinking"
pub const FALLBACK_DELAY: Duration = Duration::from_millis(2000);

/// Largest upload we'll accept, in bytes
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Request timeout for backend calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JPEG quality used when encoding the fallback result
pub const JPEG_QUALITY: u8 = 90;

/// Fallback channel multipliers, red/green/blue
pub const RED_FACTOR: f64 = 1.2;
/// See [`RED_FACTOR`]
pub const GREEN_FACTOR: f64 = 0.9;
/// See [`RED_FACTOR`]
pub const BLUE_FACTOR: f64 = 1.1;

/// How often the page reloads itself while something is pending, in seconds
pub const PENDING_REFRESH_SECONDS: u32 = 1;
