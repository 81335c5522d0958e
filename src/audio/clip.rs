use chrono::{DateTime, Utc};
use hound::WavReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::AudioError;

/// A fully decoded audio clip.
///
/// Duration is only known after decode. Clips are owned by the store
/// until handed to a message, at which point the file is immutable.
#[derive(Debug)]
pub struct AudioClip {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub samples: Vec<i16>,
    pub created_at: DateTime<Utc>,
}

impl AudioClip {
    /// Decode a WAV clip from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref();

        let reader = WavReader::open(path).map_err(|e| {
            warn!("Failed to open audio file {:?}: {}", path, e);
            AudioError::FileNotAvailable
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                warn!("Failed to read samples from {:?}: {}", path, e);
                AudioError::InternalError
            })?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio clip loaded: {:?} ({:.2}s, {}Hz, {} channels)",
            path, duration_seconds, spec.sample_rate, spec.channels
        );

        Ok(Self {
            path: path.to_path_buf(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            samples,
            created_at: Utc::now(),
        })
    }

    /// Number of inter-channel frames in the clip.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// The hound spec matching this clip's encoding.
    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Probe a clip's duration without decoding all samples.
    ///
    /// Works for any container symphonia understands (M4A, MP3, WAV,
    /// FLAC, OGG), so clips received from elsewhere can be measured too.
    /// Falls back to a full WAV decode when the container carries no
    /// frame count.
    pub fn probe_duration(path: impl AsRef<Path>) -> Result<f64, AudioError> {
        use symphonia::core::formats::FormatOptions;
        use symphonia::core::io::MediaSourceStream;
        use symphonia::core::meta::MetadataOptions;
        use symphonia::core::probe::Hint;

        let path = path.as_ref();

        let file = std::fs::File::open(path).map_err(|e| {
            warn!("Failed to open {:?} for probing: {}", path, e);
            AudioError::FileNotAvailable
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                warn!("Failed to probe {:?}: {}", path, e);
                AudioError::InternalError
            })?;

        let track = probed
            .format
            .default_track()
            .ok_or(AudioError::InternalError)?;
        let params = &track.codec_params;

        if let (Some(time_base), Some(n_frames)) = (params.time_base, params.n_frames) {
            let time = time_base.calc_time(n_frames);
            return Ok(time.seconds as f64 + time.frac);
        }

        // No frame count in the container; decode instead.
        Ok(Self::open(path)?.duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_clip(path: &Path, frames: usize, sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * channels as usize {
            writer.write_sample((i % 128) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_open_reports_duration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.wav");
        write_clip(&path, 44100, 44100, 2);

        let clip = AudioClip::open(&path).unwrap();

        assert!((clip.duration_seconds - 1.0).abs() < 1e-9);
        assert_eq!(clip.frames(), 44100);
        assert_eq!(clip.channels, 2);
    }

    #[test]
    fn test_open_missing_file() {
        assert_eq!(
            AudioClip::open("/nonexistent/clip.wav").unwrap_err(),
            AudioError::FileNotAvailable
        );
    }

    #[test]
    fn test_probe_duration_matches_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.wav");
        write_clip(&path, 22050, 44100, 2);

        let probed = AudioClip::probe_duration(&path).unwrap();
        let decoded = AudioClip::open(&path).unwrap().duration_seconds;

        assert!((probed - decoded).abs() < 0.01, "probed {probed} vs decoded {decoded}");
    }
}
