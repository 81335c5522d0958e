pub mod clip;
pub mod concat;
pub mod export;
pub mod player;
pub mod recorder;
pub mod source;
pub mod trim;

pub use clip::AudioClip;
pub use concat::Concatenator;
pub use export::{ExportStatus, WavExporter};
pub use player::{Player, PlayerEvent};
pub use recorder::{GrantAll, PermissionProbe, Recorder};
pub use source::{AudioFrame, InputSource, InputSourceFactory, SineSource, SineSourceFactory};
pub use trim::Trimmer;
