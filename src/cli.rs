//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "CAT_STUDIO_DEBUG")]
    /// Enable debug logging. Env: CAT_STUDIO_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "CAT_STUDIO_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: CAT_STUDIO_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "CAT_STUDIO_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: CAT_STUDIO_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, short = 'a', env = "CAT_STUDIO_API_BASE_URL")]
    /// Base URL of the conversion backend, defaults to `http://localhost:8080`.
    /// Env: CAT_STUDIO_API_BASE_URL
    pub api_base_url: Option<String>,

    #[clap(long, default_value = "3000", env = "CAT_STUDIO_AD_DURATION_MS")]
    /// How long the rewarded ad plays, in milliseconds.
    /// Env: CAT_STUDIO_AD_DURATION_MS
    pub ad_duration_ms: u64,

    #[clap(long, default_value = "2000", env = "CAT_STUDIO_FALLBACK_DELAY_MS")]
    /// Pause before the local fallback runs, in milliseconds.
    /// Env: CAT_STUDIO_FALLBACK_DELAY_MS
    pub fallback_delay_ms: u64,

    #[clap(long, default_value = "10485760", env = "CAT_STUDIO_MAX_UPLOAD_BYTES")]
    /// Largest accepted upload. Env: CAT_STUDIO_MAX_UPLOAD_BYTES
    pub max_upload_bytes: usize,

    #[clap(long, default_value = "30", env = "CAT_STUDIO_REQUEST_TIMEOUT_SECS")]
    /// Env: CAT_STUDIO_REQUEST_TIMEOUT_SECS
    pub request_timeout_secs: u64,
}
