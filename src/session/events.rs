use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::AudioError;

/// The recording session state. Exactly one state holds at any instant;
/// UI affordances are a pure function of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    Ready,
    Recording,
    Recorded,
    Playing,
    Paused,
}

impl RecordingState {
    /// Whether the crop/play/delete/send controls are enabled.
    ///
    /// Everything except the record toggle is disabled while recording.
    pub fn controls_enabled(self) -> bool {
        !matches!(self, Self::Recording)
    }
}

/// Gesture events arriving from the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Record button pressed down (press-and-hold).
    RecordPressed,
    /// Record button released.
    RecordReleased,
    /// Play button tapped in the crop UI.
    PlayTapped,
    /// Crop slider dragged to a new end offset in seconds.
    CropSliderChanged(f64),
    /// Crop/save button tapped.
    CropConfirmed,
    /// Trash button tapped.
    DeleteTapped,
    /// Send button tapped.
    SendTapped,
}

/// Updates the session controller emits back to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// The state changed; drives control enablement and icons.
    StateChanged { state: RecordingState },
    /// Normalized input amplitude (0.0-1.0) while recording.
    MeterLevel { level: f32 },
    /// An operation failed; `message` is the user-facing text.
    Error { kind: AudioError, message: String },
    /// The pending clip was sent and is now immutable.
    ClipFinalized { path: PathBuf, duration_seconds: f64 },
}
