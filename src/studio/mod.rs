//! The photo studio runtime.
//!
//! [`Studio`] owns the [`SessionState`] and executes the effects that
//! [`state::transition`] asks for. Timers and conversions run as tokio tasks that post
//! their completion back through an event channel, [`run`] feeds those into the studio
//! one at a time.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::client::ConvertClient;
use crate::config::StudioSettings;
use crate::dispatch::dispatch;
use crate::error::StudioError;

pub mod notice;
pub mod state;

use notice::Notice;
use state::{Download, Effect, Event, SessionState, transition};

/// Sending side of the studio's event channel.
pub type EventSender = mpsc::UnboundedSender<Event>;
/// Receiving side, drained by [`run`].
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// A studio shared between the web handlers and the event loop.
pub type SharedStudio = Arc<Mutex<Studio>>;

/// The single-session photo studio.
#[derive(Debug)]
pub struct Studio {
    state: SessionState,
    settings: StudioSettings,
    client: ConvertClient,
    events: EventSender,
    pending: Vec<AbortHandle>,
    notices: VecDeque<Notice>,
}

impl Studio {
    /// Creates a studio and the receiver its background tasks report to.
    pub fn new(settings: StudioSettings) -> Result<(Self, EventReceiver), StudioError> {
        let client = ConvertClient::new(&settings)?;
        let (events, receiver) = mpsc::unbounded_channel();
        Ok((
            Self {
                state: SessionState::default(),
                settings,
                client,
                events,
                pending: Vec::new(),
                notices: VecDeque::new(),
            },
            receiver,
        ))
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Settings the studio runs with.
    pub fn settings(&self) -> &StudioSettings {
        &self.settings
    }

    /// Kicks off the one-shot backend health probe.
    pub fn mount(&self) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let status = client.health().await;
            if events.send(Event::HealthChecked(status)).is_err() {
                debug!("Studio went away before the health check finished");
            }
        });
    }

    /// Applies `event` and runs whatever it triggers. Returns files to offer for saving.
    pub fn handle(&mut self, event: Event) -> Vec<Download> {
        let before = self.state.generation;
        let (next, effects) = transition(std::mem::take(&mut self.state), event);
        self.state = next;

        if self.state.generation != before {
            self.cancel_pending();
        }
        self.pending.retain(|task| !task.is_finished());

        let mut downloads = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartAdTimer { generation } => self.start_ad_timer(generation),
                Effect::Convert { generation, image } => {
                    let client = self.client.clone();
                    let events = self.events.clone();
                    let delay = self.settings.fallback_delay;
                    let task = tokio::spawn(async move {
                        let event = match dispatch(&client, &image, delay).await {
                            Ok(conversion) => Event::ConvertSucceeded {
                                generation,
                                conversion,
                            },
                            Err(err) => {
                                warn!("Conversion failed: {}", err);
                                Event::ConvertFailed {
                                    generation,
                                    message: err.to_string(),
                                }
                            }
                        };
                        let _ = events.send(event);
                    });
                    self.pending.push(task.abort_handle());
                }
                Effect::Notify(notice) => {
                    info!("Notice: {}", notice.text());
                    self.notices.push_back(notice);
                }
                Effect::Save(download) => downloads.push(download),
            }
        }
        downloads
    }

    /// Takes every queued notice, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Number of timers/conversions still running.
    pub fn pending_tasks(&self) -> usize {
        self.pending.iter().filter(|task| !task.is_finished()).count()
    }

    fn start_ad_timer(&mut self, generation: u64) {
        let events = self.events.clone();
        let duration = self.settings.ad_duration;
        debug!("Ad playing for {:?}", duration);
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = events.send(Event::AdCompleted { generation });
        });
        self.pending.push(task.abort_handle());
    }

    fn cancel_pending(&mut self) {
        for task in self.pending.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Feeds completions from background tasks into the studio, one at a time.
pub async fn run(studio: SharedStudio, mut receiver: EventReceiver) {
    while let Some(event) = receiver.recv().await {
        studio.lock().await.handle(event);
    }
    debug!("Studio event loop finished");
}
