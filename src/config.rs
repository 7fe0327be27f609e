//! Config handling

use std::time::Duration;

use tracing::log::LevelFilter;
use url::Url;

use crate::cli::CliOptions;
use crate::constants::{
    AD_DURATION, DEFAULT_API_BASE_URL, FALLBACK_DELAY, MAX_UPLOAD_BYTES, REQUEST_TIMEOUT,
};
use crate::error::StudioError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Runtime knobs for the studio, usually built from [`CliOptions`].
#[derive(Clone, Debug)]
pub struct StudioSettings {
    /// Where the conversion backend lives
    pub api_base_url: Url,
    /// How long the simulated ad plays
    pub ad_duration: Duration,
    /// Pause before running the local fallback
    pub fallback_delay: Duration,
    /// Upload size limit in bytes
    pub max_upload_bytes: usize,
    /// Timeout for each backend request
    pub request_timeout: Duration,
}

impl StudioSettings {
    /// Settings with the default timings against the given backend.
    pub fn new(api_base_url: &str) -> Result<Self, StudioError> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            ad_duration: AD_DURATION,
            fallback_delay: FALLBACK_DELAY,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Builds settings from the parsed command line / environment.
    pub fn from_cli(cli: &CliOptions) -> Result<Self, StudioError> {
        let base = cli
            .api_base_url
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL);
        Ok(Self {
            api_base_url: parse_base_url(base)?,
            ad_duration: Duration::from_millis(cli.ad_duration_ms),
            fallback_delay: Duration::from_millis(cli.fallback_delay_ms),
            max_upload_bytes: cli.max_upload_bytes,
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
        })
    }
}

/// Parses the base URL, only http(s) makes sense here.
fn parse_base_url(value: &str) -> Result<Url, StudioError> {
    let url = Url::parse(value.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(StudioError::InvalidConfig(format!(
            "API base URL must be http or https, got {other}"
        ))),
    }
}
