use std::path::Path;
use tracing::{info, warn};

use crate::audio::clip::AudioClip;
use crate::audio::export::WavExporter;
use crate::error::AudioError;
use crate::store::AudioFileStore;

/// Exports the time range [0, end_offset] of a clip and replaces the
/// original in place.
///
/// The export goes to a fresh temp file at full quality in the same
/// container; only after it completes is the original deleted and the
/// temp moved over it. On any failure the original is left untouched.
#[derive(Clone)]
pub struct Trimmer {
    store: AudioFileStore,
    exporter: WavExporter,
}

impl Trimmer {
    pub fn new(store: AudioFileStore, exporter: WavExporter) -> Self {
        Self { store, exporter }
    }

    /// Shorten the clip at `path` to `end_offset_seconds`.
    ///
    /// The offset is clamped to [0, duration]; the UI slider maximum is
    /// the known duration, so out-of-range values only arise from
    /// rounding.
    pub async fn trim(&self, path: &Path, end_offset_seconds: f64) -> Result<(), AudioError> {
        let clip = AudioClip::open(path)?;

        let end = end_offset_seconds.clamp(0.0, clip.duration_seconds);
        let keep_frames = (end * clip.sample_rate as f64).round() as usize;
        let keep_samples = (keep_frames * clip.channels as usize).min(clip.samples.len());

        let temp_path = self.store.trim_temp_path(path);
        if self.store.exists(&temp_path) {
            warn!("Removing stale trim temp {:?}", temp_path);
            self.store.delete(&temp_path)?;
        }

        let spec = clip.wav_spec();
        let kept = clip.samples[..keep_samples].to_vec();

        self.exporter
            .export(temp_path.clone(), spec, kept)
            .await
            .into_result()?;

        // Export confirmed; replace the original.
        let mut delete_failure = None;
        if let Err(e) = self.store.delete(path) {
            delete_failure = Some(e);
        }

        if self.store.move_file(&temp_path, path).is_err() {
            return Err(AudioError::ExportFailed);
        }

        match delete_failure {
            Some(kind) => Err(kind),
            None => {
                info!("Trimmed {:?} to {:.2}s", path, end);
                Ok(())
            }
        }
    }
}
