use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the recording subsystem.
///
/// The capture format is fixed for the lifetime of a session: lossless
/// 16-bit PCM, stereo, 44.1kHz. Timer intervals drive the metering and
/// playback-bound tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Number of capture channels (2 = stereo)
    pub channels: u16,

    /// Bits per sample for the on-disk PCM encoding
    pub bits_per_sample: u16,

    /// How often the recorder emits a meter-level event
    pub metering_interval: Duration,

    /// How often the player checks playback position against the crop bound
    pub playback_poll_interval: Duration,

    /// How long to wait for a permission answer before treating it as denied
    pub permission_timeout: Duration,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            metering_interval: Duration::from_millis(50),
            playback_poll_interval: Duration::from_millis(100),
            permission_timeout: Duration::from_secs(5),
        }
    }
}

impl AudioSettings {
    /// The hound spec matching the capture format.
    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capture_format() {
        let settings = AudioSettings::default();

        assert_eq!(settings.sample_rate, 44100);
        assert_eq!(settings.channels, 2);
        assert_eq!(settings.bits_per_sample, 16);
        assert_eq!(settings.metering_interval, Duration::from_millis(50));
        assert_eq!(settings.playback_poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_wav_spec_matches_settings() {
        let settings = AudioSettings::default();
        let spec = settings.wav_spec();

        assert_eq!(spec.sample_rate, settings.sample_rate);
        assert_eq!(spec.channels, settings.channels);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    }
}
