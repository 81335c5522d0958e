use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kinds reported by the audio components.
///
/// Every operation returns one of these; the `Display` string is the
/// human-readable message a UI surfaces in its alert. The session
/// controller never invents kinds of its own, it only decides which
/// state the session ends up in.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioError {
    #[error("The application is currently recording sound")]
    AlreadyRecording,

    #[error("The application is already playing a sound")]
    AlreadyPlaying,

    #[error("The application is not currently recording")]
    NotCurrentlyRecording,

    #[error("Unable to record sound because the permission has not been granted. This can be changed in your settings.")]
    PermissionDenied,

    #[error("Unable to record sound at the moment, please try again")]
    RecordFailed,

    #[error("Unable to play sound at the moment, please try again")]
    PlayFailed,

    #[error("Audio file is not available")]
    FileNotAvailable,

    #[error("Audio export failed")]
    ExportFailed,

    #[error("Audio export was cancelled")]
    ExportCancelled,

    #[error("Audio export ended in an unknown state")]
    ExportUnknown,

    #[error("Audio export is still waiting to start")]
    ExportWaiting,

    #[error("Audio export is still in progress")]
    ExportExporting,

    #[error("Another audio operation is in progress, please wait for it to finish")]
    OperationInProgress,

    #[error("An error occurred while trying to process the audio command, please try again")]
    InternalError,
}
