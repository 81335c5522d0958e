use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::audio::clip::AudioClip;
use crate::config::AudioSettings;
use crate::error::AudioError;

/// Emitted when a playback reaches its end (natural finish or crop bound).
///
/// A playback that is replaced or stopped explicitly is released
/// silently and emits nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Finished { success: bool },
}

/// Plays a clip from offset 0, optionally bounded by a stop position.
///
/// Playback position advances against a monotonic clock over the
/// decoded duration; a bound-watch task polls it and stops playback once
/// it passes the bound. At most one playback is active at a time;
/// starting a new one silently releases the prior handle.
pub struct Player {
    settings: AudioSettings,
    events: mpsc::UnboundedSender<PlayerEvent>,
    active: Option<ActivePlayback>,
}

struct ActivePlayback {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Player {
    pub fn new(settings: AudioSettings, events: mpsc::UnboundedSender<PlayerEvent>) -> Self {
        Self {
            settings,
            events,
            active: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active
            .as_ref()
            .map(|a| !a.task.is_finished())
            .unwrap_or(false)
    }

    /// Begin playback of `path`, stopping once the position passes
    /// `stop_at_seconds` (or the clip's end if `None`).
    pub fn play(&mut self, path: &Path, stop_at_seconds: Option<f64>) -> Result<(), AudioError> {
        let duration = AudioClip::probe_duration(path).map_err(|_| AudioError::PlayFailed)?;
        let bound = stop_at_seconds.unwrap_or(duration).clamp(0.0, duration);

        // Replacing the active playback silently releases it.
        self.release_active();

        let cancel = Arc::new(AtomicBool::new(false));
        let task_cancel = Arc::clone(&cancel);
        let events = self.events.clone();
        let poll = self.settings.playback_poll_interval;

        let task = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut ticker = tokio::time::interval(poll);

            loop {
                ticker.tick().await;
                if task_cancel.load(Ordering::SeqCst) {
                    return;
                }
                if started.elapsed().as_secs_f64() > bound {
                    break;
                }
            }

            let _ = events.send(PlayerEvent::Finished { success: true });
        });

        info!(
            "Playback started: {:?} (stopping at {:.2}s of {:.2}s)",
            path, bound, duration
        );

        self.active = Some(ActivePlayback { cancel, task });
        Ok(())
    }

    /// Stop the active playback, cancelling its bound-watch task.
    pub fn stop(&mut self) {
        self.release_active();
    }

    fn release_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.store(true, Ordering::SeqCst);
            active.task.abort();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.release_active();
    }
}
