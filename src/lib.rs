pub mod audio;
pub mod config;
pub mod error;
pub mod message;
pub mod session;
pub mod store;

pub use audio::{
    AudioClip, AudioFrame, Concatenator, ExportStatus, GrantAll, InputSource, InputSourceFactory,
    PermissionProbe, Player, PlayerEvent, Recorder, SineSource, SineSourceFactory, Trimmer,
    WavExporter,
};
pub use config::AudioSettings;
pub use error::AudioError;
pub use message::Message;
pub use session::{GestureEvent, RecordingState, SessionController, SessionUpdate};
pub use store::AudioFileStore;
