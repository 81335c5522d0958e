pub mod controller;
pub mod events;

pub use controller::SessionController;
pub use events::{GestureEvent, RecordingState, SessionUpdate};
