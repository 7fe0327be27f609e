//! The studio's session state and its pure transition function.
//!
//! Every user action and every asynchronous completion is an [`Event`]. Applying one
//! with [`transition`] yields the next [`SessionState`] plus the [`Effect`]s the
//! runtime has to carry out. Nothing in here touches timers, the network or the clock.

use tracing::debug;

use super::notice::Notice;
use crate::constants::DOWNLOAD_FILE_NAME;
use crate::upload::StudioImage;

/// What the health probe found out about the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendStatus {
    /// Still checking
    #[default]
    Unknown,
    /// `/api/health` answered 2xx
    Reachable,
    /// Anything else
    Unreachable,
}

/// The rewarded ad gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdGate {
    /// No ad watched for this photo yet
    #[default]
    Idle,
    /// The ad is on screen, waiting for its timer
    Playing,
    /// The ad finished, conversion is allowed
    Watched,
}

/// How a conversion result was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversionPath {
    /// The backend did it
    Remote,
    /// The backend failed and the local tint was applied
    Fallback {
        /// Why the remote attempt failed
        reason: String,
    },
}

/// A finished conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    /// The converted picture
    pub image: StudioImage,
    /// Which path made it
    pub path: ConversionPath,
}

/// A file offered to the user for saving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    /// Name to save under
    pub file_name: &'static str,
    /// What gets saved
    pub image: StudioImage,
}

/// All state a single studio session carries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Bumped on every upload and reset, async results from older generations are dropped
    pub generation: u64,
    /// The photo the user picked
    pub original: Option<StudioImage>,
    /// The cat version, once there is one
    pub converted: Option<StudioImage>,
    /// A conversion is in flight
    pub processing: bool,
    /// Where the ad gate is at
    pub ad_gate: AdGate,
    /// Result of the startup health probe
    pub backend: BackendStatus,
    /// File name currently held by the file picker
    pub picker_selection: Option<String>,
}

impl SessionState {
    /// Conversion is unlocked.
    pub fn ad_gate_open(&self) -> bool {
        self.ad_gate == AdGate::Watched
    }

    /// The ad modal is on screen.
    pub fn ad_modal_visible(&self) -> bool {
        self.ad_gate == AdGate::Playing
    }

    /// A timer or conversion will change the state without user input.
    ///
    /// The health probe doesn't count, it never affects the flow.
    pub fn is_pending(&self) -> bool {
        self.processing || self.ad_modal_visible()
    }

    fn start_new_session(mut self) -> Self {
        self.generation = self.generation.wrapping_add(1);
        self.original = None;
        self.converted = None;
        self.processing = false;
        self.ad_gate = AdGate::Idle;
        self.picker_selection = None;
        self
    }
}

/// Inputs to the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The health probe finished
    HealthChecked(BackendStatus),
    /// The user picked a file and it was read successfully
    Uploaded {
        /// Name as reported by the picker
        file_name: Option<String>,
        /// The decoded upload
        image: StudioImage,
    },
    /// The picked file couldn't be used
    UploadFailed(String),
    /// The user wants to watch the ad
    AdRequested,
    /// The ad timer fired
    AdCompleted {
        /// Generation the timer was started in
        generation: u64,
    },
    /// The user pressed convert
    ConvertRequested,
    /// A conversion finished with a picture
    ConvertSucceeded {
        /// Generation the conversion was started in
        generation: u64,
        /// The result
        conversion: Conversion,
    },
    /// A conversion finished without a picture
    ConvertFailed {
        /// Generation the conversion was started in
        generation: u64,
        /// Why
        message: String,
    },
    /// The user wants to save the result
    DownloadRequested,
    /// Start over
    Reset,
}

/// Side effects requested by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Start the ad timer, it reports back with [`Event::AdCompleted`]
    StartAdTimer {
        /// Generation to report back with
        generation: u64,
    },
    /// Run a conversion, it reports back with a `Convert*` event
    Convert {
        /// Generation to report back with
        generation: u64,
        /// The photo to convert
        image: StudioImage,
    },
    /// Show a notice
    Notify(Notice),
    /// Offer a file for saving
    Save(Download),
}

/// Applies `event` to `state`.
pub fn transition(state: SessionState, event: Event) -> (SessionState, Vec<Effect>) {
    match event {
        Event::HealthChecked(status) => (
            SessionState {
                backend: status,
                ..state
            },
            Vec::new(),
        ),
        Event::Uploaded { file_name, image } => {
            let mut next = state.start_new_session();
            next.original = Some(image);
            next.picker_selection = file_name;
            (next, Vec::new())
        }
        Event::UploadFailed(reason) => (state, vec![Effect::Notify(Notice::UploadRejected(reason))]),
        Event::AdRequested => {
            if state.original.is_none() || state.ad_gate != AdGate::Idle {
                debug!("Ignoring ad request, gate is {:?}", state.ad_gate);
                return (state, Vec::new());
            }
            let generation = state.generation;
            (
                SessionState {
                    ad_gate: AdGate::Playing,
                    ..state
                },
                vec![Effect::StartAdTimer { generation }],
            )
        }
        Event::AdCompleted { generation } => {
            if generation != state.generation || state.ad_gate != AdGate::Playing {
                debug!(
                    "Dropping stale ad completion from generation {} (now {})",
                    generation, state.generation
                );
                return (state, Vec::new());
            }
            (
                SessionState {
                    ad_gate: AdGate::Watched,
                    ..state
                },
                vec![Effect::Notify(Notice::AdWatched)],
            )
        }
        Event::ConvertRequested => {
            let Some(image) = state.original.clone() else {
                return (state, Vec::new());
            };
            if !state.ad_gate_open() || state.processing {
                debug!(
                    "Ignoring convert request, gate open: {}, processing: {}",
                    state.ad_gate_open(),
                    state.processing
                );
                return (state, Vec::new());
            }
            let generation = state.generation;
            (
                SessionState {
                    processing: true,
                    ..state
                },
                vec![Effect::Convert { generation, image }],
            )
        }
        Event::ConvertSucceeded {
            generation,
            conversion,
        } => {
            if generation != state.generation || !state.processing {
                debug!("Dropping stale conversion from generation {}", generation);
                return (state, Vec::new());
            }
            let notices = match conversion.path {
                ConversionPath::Remote => vec![Effect::Notify(Notice::ConversionSucceeded)],
                ConversionPath::Fallback { reason } => vec![
                    Effect::Notify(Notice::RemoteFailed(reason)),
                    Effect::Notify(Notice::FallbackUsed),
                ],
            };
            (
                SessionState {
                    converted: Some(conversion.image),
                    processing: false,
                    ..state
                },
                notices,
            )
        }
        Event::ConvertFailed {
            generation,
            message,
        } => {
            if generation != state.generation || !state.processing {
                debug!("Dropping stale conversion failure from generation {}", generation);
                return (state, Vec::new());
            }
            (
                SessionState {
                    processing: false,
                    ..state
                },
                vec![Effect::Notify(Notice::ConversionFailed(message))],
            )
        }
        Event::DownloadRequested => {
            let effects = state
                .converted
                .clone()
                .map(|image| {
                    Effect::Save(Download {
                        file_name: DOWNLOAD_FILE_NAME,
                        image,
                    })
                })
                .into_iter()
                .collect();
            (state, effects)
        }
        Event::Reset => (state.start_new_session(), Vec::new()),
    }
}
