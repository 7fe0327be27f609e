//! Toast-style notices shown once on the next page render.

/// Something worth telling the user about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The ad finished, conversion is unlocked
    AdWatched,
    /// The backend converted the photo
    ConversionSucceeded,
    /// The backend call failed, with the reason
    RemoteFailed(String),
    /// The local simulation produced the result
    FallbackUsed,
    /// Nothing could produce a result
    ConversionFailed(String),
    /// The uploaded file was refused
    UploadRejected(String),
}

impl Notice {
    /// Text shown to the user.
    pub fn text(&self) -> String {
        match self {
            Self::AdWatched => {
                "You watched the ad! You can now start the AI conversion.".to_string()
            }
            Self::ConversionSucceeded => "🎉 The AI conversion is done!".to_string(),
            Self::RemoteFailed(reason) => format!("❌ Conversion failed: {reason}"),
            Self::FallbackUsed => {
                "⚠️ Couldn't reach the API, running in simulation mode.".to_string()
            }
            Self::ConversionFailed(reason) => {
                format!("❌ Couldn't convert your photo: {reason}")
            }
            Self::UploadRejected(reason) => format!("❌ {reason}"),
        }
    }

    /// CSS class for the banner.
    pub fn class(&self) -> &'static str {
        match self {
            Self::AdWatched | Self::ConversionSucceeded => "success",
            Self::RemoteFailed(_) | Self::FallbackUsed => "warning",
            Self::ConversionFailed(_) | Self::UploadRejected(_) => "error",
        }
    }
}
