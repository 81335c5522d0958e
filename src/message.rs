use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A message appended to the conversation log.
///
/// Either plain text or a finalized voice clip. Audio messages reference
/// the clip by path; the file is immutable once the message exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Text { text: String },
    Audio { path: PathBuf, duration_seconds: f64 },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn audio(path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self::Audio {
            path: path.into(),
            duration_seconds,
        }
    }

    /// The display text of the message; audio messages render their path.
    pub fn display_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Audio { path, .. } => path.display().to_string(),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_display() {
        let msg = Message::text("hello");
        assert_eq!(msg.display_text(), "hello");
        assert!(!msg.is_audio());
    }

    #[test]
    fn test_audio_message_displays_path() {
        let msg = Message::audio("/tmp/voice-message-1.wav", 3.5);
        assert_eq!(msg.display_text(), "/tmp/voice-message-1.wav");
        assert!(msg.is_audio());
    }

    #[test]
    fn test_message_serializes_tagged() {
        let msg = Message::audio("/tmp/a.wav", 1.0);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "audio");
        assert_eq!(json["duration_seconds"], 1.0);
    }
}
