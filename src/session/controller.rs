use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::audio::clip::AudioClip;
use crate::audio::concat::Concatenator;
use crate::audio::export::WavExporter;
use crate::audio::player::{Player, PlayerEvent};
use crate::audio::recorder::{PermissionProbe, Recorder};
use crate::audio::source::InputSourceFactory;
use crate::audio::trim::Trimmer;
use crate::config::AudioSettings;
use crate::error::AudioError;
use crate::session::events::{GestureEvent, RecordingState, SessionUpdate};
use crate::store::AudioFileStore;

/// The in-progress voice message, alive between "start recording" and
/// "send or discard".
struct PendingSession {
    /// The pending clip file; mutable during the crop/concatenate window.
    clip_path: PathBuf,
    /// Segment being recorded on top of the pending clip, if any.
    segment_path: Option<PathBuf>,
    /// Crop slider position in seconds; defaults to the full duration.
    crop_end: f64,
    /// Known duration of the pending clip.
    duration: f64,
    #[allow(dead_code)]
    started_at: DateTime<Utc>,
}

impl PendingSession {
    fn new(clip_path: PathBuf) -> Self {
        Self {
            clip_path,
            segment_path: None,
            crop_end: 0.0,
            duration: 0.0,
            started_at: Utc::now(),
        }
    }
}

struct Inner {
    state: RecordingState,
    settings: AudioSettings,
    store: AudioFileStore,
    sources: Box<dyn InputSourceFactory>,
    recorder: Recorder,
    player: Player,
    concatenator: Concatenator,
    trimmer: Trimmer,
    session: Option<PendingSession>,
    /// Set while a concatenate/trim export is in flight; gestures that
    /// would start another operation are rejected until it clears.
    busy: bool,
}

/// The state machine reconciling overlapping user gestures into one
/// consistent recording session.
///
/// All gesture events funnel through [`handle`](Self::handle); updates
/// flow back on the channel returned by [`new`](Self::new). Errors leave
/// the state unchanged except where the transition table says otherwise,
/// and the pending clip is never deleted as a side effect of a failed
/// operation.
pub struct SessionController {
    inner: Arc<Mutex<Inner>>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
}

impl SessionController {
    /// Create a controller and the update stream it reports on.
    ///
    /// Must be called within a tokio runtime; the controller spawns its
    /// metering forwarder and playback watcher tasks here.
    pub fn new(
        settings: AudioSettings,
        store: AudioFileStore,
        sources: Box<dyn InputSourceFactory>,
        probe: Box<dyn PermissionProbe>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (meter_tx, mut meter_rx) = mpsc::unbounded_channel();
        let (player_tx, mut player_rx) = mpsc::unbounded_channel();

        let recorder = Recorder::new(settings.clone(), meter_tx, probe);
        let recording_flag = recorder.recording_flag();
        let exporter = WavExporter::new();
        let concatenator = Concatenator::new(store.clone(), exporter.clone(), recording_flag);
        let trimmer = Trimmer::new(store.clone(), exporter);
        let player = Player::new(settings.clone(), player_tx);

        let inner = Arc::new(Mutex::new(Inner {
            state: RecordingState::Ready,
            settings,
            store,
            sources,
            recorder,
            player,
            concatenator,
            trimmer,
            session: None,
            busy: false,
        }));

        // Forward meter levels onto the UI update stream.
        let meter_updates = updates_tx.clone();
        tokio::spawn(async move {
            while let Some(level) = meter_rx.recv().await {
                if meter_updates
                    .send(SessionUpdate::MeterLevel { level })
                    .is_err()
                {
                    break;
                }
            }
        });

        // Playback auto-stop transitions playing -> paused.
        let watcher_inner = Arc::clone(&inner);
        let watcher_updates = updates_tx.clone();
        tokio::spawn(async move {
            while let Some(PlayerEvent::Finished { .. }) = player_rx.recv().await {
                let mut inner = watcher_inner.lock().await;
                if inner.state == RecordingState::Playing {
                    inner.state = RecordingState::Paused;
                    let _ = watcher_updates.send(SessionUpdate::StateChanged {
                        state: RecordingState::Paused,
                    });
                }
            }
        });

        (
            Self {
                inner,
                updates: updates_tx,
            },
            updates_rx,
        )
    }

    pub async fn state(&self) -> RecordingState {
        self.inner.lock().await.state
    }

    /// The pending clip's path and known duration, if a session exists.
    pub async fn pending_clip(&self) -> Option<(PathBuf, f64)> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| (s.clip_path.clone(), s.duration))
    }

    /// Current crop slider position, if a session exists.
    pub async fn crop_end(&self) -> Option<f64> {
        self.inner.lock().await.session.as_ref().map(|s| s.crop_end)
    }

    /// Dispatch a UI gesture. On error the kind is also emitted as an
    /// `Error` update with its user-facing message.
    pub async fn handle(&self, event: GestureEvent) -> Result<RecordingState, AudioError> {
        let result = match event {
            GestureEvent::RecordPressed => self.record_pressed().await,
            GestureEvent::RecordReleased => self.record_released().await,
            GestureEvent::PlayTapped => self.play_tapped().await,
            GestureEvent::CropSliderChanged(value) => self.crop_slider_changed(value).await,
            GestureEvent::CropConfirmed => self.crop_confirmed().await,
            GestureEvent::DeleteTapped => self.delete_tapped().await,
            GestureEvent::SendTapped => self.send_tapped().await,
        };

        if let Err(kind) = result {
            let _ = self.updates.send(SessionUpdate::Error {
                kind,
                message: kind.to_string(),
            });
        }

        result
    }

    fn set_state(&self, inner: &mut Inner, state: RecordingState) {
        if inner.state != state {
            inner.state = state;
            let _ = self.updates.send(SessionUpdate::StateChanged { state });
        }
    }

    async fn record_pressed(&self) -> Result<RecordingState, AudioError> {
        let mut inner = self.inner.lock().await;

        if inner.busy {
            return Err(AudioError::OperationInProgress);
        }

        match inner.state {
            RecordingState::Recording => return Err(AudioError::AlreadyRecording),
            RecordingState::Playing => return Err(AudioError::AlreadyPlaying),
            RecordingState::Ready | RecordingState::Recorded | RecordingState::Paused => {}
        }

        if !inner.recorder.request_permission().await {
            return Err(AudioError::PermissionDenied);
        }

        let fresh_session = inner.session.is_none();
        let target = if fresh_session {
            let path = inner.store.allocate_clip_path();
            inner.session = Some(PendingSession::new(path.clone()));
            path
        } else {
            // Re-record while cropping: capture a new segment to
            // concatenate onto the pending clip on release.
            let segment = inner.store.allocate_clip_path();
            if let Some(session) = inner.session.as_mut() {
                session.segment_path = Some(segment.clone());
            }
            segment
        };

        let started = match inner.sources.create(&inner.settings) {
            Ok(source) => inner.recorder.start(&target, source).await,
            Err(kind) => Err(kind),
        };

        if let Err(kind) = started {
            if fresh_session {
                inner.session = None;
            } else if let Some(session) = inner.session.as_mut() {
                session.segment_path = None;
            }
            return Err(kind);
        }

        self.set_state(&mut inner, RecordingState::Recording);
        Ok(RecordingState::Recording)
    }

    async fn record_released(&self) -> Result<RecordingState, AudioError> {
        let mut inner = self.inner.lock().await;

        if inner.state != RecordingState::Recording {
            return Err(AudioError::NotCurrentlyRecording);
        }

        let duration = inner.recorder.stop().await?;

        let Some(session) = inner.session.as_mut() else {
            return Err(AudioError::InternalError);
        };

        match session.segment_path.take() {
            None => {
                // First segment: the recording becomes the pending clip.
                session.duration = duration;
                session.crop_end = duration;
                self.set_state(&mut inner, RecordingState::Recorded);
                Ok(RecordingState::Recorded)
            }
            Some(segment) => {
                let pending = session.clip_path.clone();
                inner.busy = true;
                let concatenator = inner.concatenator.clone();
                drop(inner);

                let result = concatenator.concatenate(&pending, &segment).await;

                let mut inner = self.inner.lock().await;
                inner.busy = false;

                match result {
                    Ok(()) => match AudioClip::probe_duration(&pending) {
                        Ok(total) => {
                            if let Some(session) = inner.session.as_mut() {
                                session.duration = total;
                                session.crop_end = total;
                            }
                            self.set_state(&mut inner, RecordingState::Recorded);
                            Ok(RecordingState::Recorded)
                        }
                        Err(kind) => {
                            self.set_state(&mut inner, RecordingState::Recorded);
                            Err(kind)
                        }
                    },
                    Err(kind) => {
                        // The pending clip survives a failed concatenate;
                        // the new segment stays on disk so a retry remains
                        // possible.
                        warn!("Concatenate failed, segment retained at {:?}", segment);
                        self.set_state(&mut inner, RecordingState::Recorded);
                        Err(kind)
                    }
                }
            }
        }
    }

    async fn play_tapped(&self) -> Result<RecordingState, AudioError> {
        let mut inner = self.inner.lock().await;

        if inner.busy {
            return Err(AudioError::OperationInProgress);
        }

        match inner.state {
            RecordingState::Recorded | RecordingState::Paused => {}
            RecordingState::Playing => return Err(AudioError::AlreadyPlaying),
            RecordingState::Recording => return Err(AudioError::AlreadyRecording),
            RecordingState::Ready => return Err(AudioError::PlayFailed),
        }

        let (path, bound) = {
            let session = inner.session.as_ref().ok_or(AudioError::InternalError)?;
            (session.clip_path.clone(), session.crop_end)
        };

        inner.player.play(&path, Some(bound))?;
        self.set_state(&mut inner, RecordingState::Playing);
        Ok(RecordingState::Playing)
    }

    async fn crop_slider_changed(&self, value: f64) -> Result<RecordingState, AudioError> {
        let mut inner = self.inner.lock().await;

        // Only meaningful while the crop UI is open; otherwise the
        // control is disabled and the drag is a no-op.
        if matches!(
            inner.state,
            RecordingState::Recorded | RecordingState::Paused
        ) {
            if let Some(session) = inner.session.as_mut() {
                session.crop_end = value.clamp(0.0, session.duration);
            }
        }

        Ok(inner.state)
    }

    async fn crop_confirmed(&self) -> Result<RecordingState, AudioError> {
        let mut inner = self.inner.lock().await;

        if inner.busy {
            return Err(AudioError::OperationInProgress);
        }

        match inner.state {
            RecordingState::Recorded | RecordingState::Paused => {}
            RecordingState::Recording => return Err(AudioError::AlreadyRecording),
            RecordingState::Playing => return Err(AudioError::AlreadyPlaying),
            RecordingState::Ready => return Err(AudioError::FileNotAvailable),
        }

        let (path, end) = {
            let session = inner.session.as_ref().ok_or(AudioError::InternalError)?;
            (session.clip_path.clone(), session.crop_end)
        };

        inner.busy = true;
        let trimmer = inner.trimmer.clone();
        drop(inner);

        let result = trimmer.trim(&path, end).await;

        let mut inner = self.inner.lock().await;
        inner.busy = false;

        match result {
            Ok(()) => match AudioClip::probe_duration(&path) {
                Ok(duration) => {
                    if let Some(session) = inner.session.as_mut() {
                        session.duration = duration;
                        session.crop_end = duration;
                    }
                    self.set_state(&mut inner, RecordingState::Recorded);
                    Ok(RecordingState::Recorded)
                }
                Err(kind) => {
                    self.set_state(&mut inner, RecordingState::Recorded);
                    Err(kind)
                }
            },
            Err(kind) => {
                // Failed trim leaves the pending clip untouched and the
                // session in recorded so the user can retry or delete.
                self.set_state(&mut inner, RecordingState::Recorded);
                Err(kind)
            }
        }
    }

    async fn delete_tapped(&self) -> Result<RecordingState, AudioError> {
        let mut inner = self.inner.lock().await;

        if inner.busy {
            return Err(AudioError::OperationInProgress);
        }

        match inner.state {
            RecordingState::Recorded | RecordingState::Paused => {}
            RecordingState::Recording => return Err(AudioError::AlreadyRecording),
            RecordingState::Playing => return Err(AudioError::AlreadyPlaying),
            RecordingState::Ready => return Err(AudioError::FileNotAvailable),
        }

        let path = {
            let session = inner.session.as_ref().ok_or(AudioError::InternalError)?;
            session.clip_path.clone()
        };

        inner.player.stop();

        if inner.store.exists(&path) {
            inner.store.delete(&path)?;
        }

        inner.session = None;
        self.set_state(&mut inner, RecordingState::Ready);
        info!("Recording session discarded");
        Ok(RecordingState::Ready)
    }

    async fn send_tapped(&self) -> Result<RecordingState, AudioError> {
        let mut inner = self.inner.lock().await;

        if inner.busy {
            return Err(AudioError::OperationInProgress);
        }

        match inner.state {
            RecordingState::Recorded | RecordingState::Paused => {}
            RecordingState::Recording => return Err(AudioError::AlreadyRecording),
            RecordingState::Playing => return Err(AudioError::AlreadyPlaying),
            RecordingState::Ready => return Err(AudioError::FileNotAvailable),
        }

        let (path, duration_seconds) = {
            let session = inner.session.as_ref().ok_or(AudioError::InternalError)?;
            (session.clip_path.clone(), session.duration)
        };

        inner.player.stop();
        inner.session = None;

        let _ = self.updates.send(SessionUpdate::ClipFinalized {
            path: path.clone(),
            duration_seconds,
        });
        self.set_state(&mut inner, RecordingState::Ready);
        info!("Voice message finalized: {:?} ({:.2}s)", path, duration_seconds);
        Ok(RecordingState::Ready)
    }
}
