use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::audio::clip::AudioClip;
use crate::audio::export::WavExporter;
use crate::error::AudioError;
use crate::store::AudioFileStore;

/// Merges two clips into one file, replacing the first and deleting the
/// second on success.
///
/// The append is track-level: the second clip's samples follow the
/// first's in full, no per-sample re-encoding. File deletion and the
/// final move run strictly after the export has confirmed completion.
#[derive(Clone)]
pub struct Concatenator {
    store: AudioFileStore,
    exporter: WavExporter,
    recording: Arc<AtomicBool>,
}

impl Concatenator {
    pub fn new(store: AudioFileStore, exporter: WavExporter, recording: Arc<AtomicBool>) -> Self {
        Self {
            store,
            exporter,
            recording,
        }
    }

    /// Append `second` after `first`, leaving the merged clip at
    /// `first`'s path and removing `second`.
    ///
    /// If deleting the originals fails the move is still attempted and
    /// `FileNotAvailable` is reported; a failed move is `ExportFailed`.
    /// On any failure before the move, both originals are left on disk.
    pub async fn concatenate(&self, first: &Path, second: &Path) -> Result<(), AudioError> {
        if self.recording.load(Ordering::SeqCst) {
            warn!("Tried to concatenate while a recording is active");
            return Err(AudioError::AlreadyRecording);
        }

        let head = AudioClip::open(first)?;
        let tail = AudioClip::open(second)?;

        if head.sample_rate != tail.sample_rate || head.channels != tail.channels {
            warn!(
                "Clip format mismatch: {}Hz/{}ch vs {}Hz/{}ch",
                head.sample_rate, head.channels, tail.sample_rate, tail.channels
            );
            return Err(AudioError::ExportFailed);
        }

        let spec = head.wav_spec();
        let mut merged = head.samples;
        merged.extend_from_slice(&tail.samples);

        let merge_path = self.store.merge_temp_path();
        self.exporter
            .export(merge_path.clone(), spec, merged)
            .await
            .into_result()?;

        // Export confirmed; now dispose of the originals and move the
        // merged file into place.
        let mut delete_failure = None;
        for original in [first, second] {
            if self.store.exists(original) {
                if let Err(e) = self.store.delete(original) {
                    delete_failure = Some(e);
                }
            }
        }

        if self.store.move_file(&merge_path, first).is_err() {
            return Err(AudioError::ExportFailed);
        }

        match delete_failure {
            Some(kind) => Err(kind),
            None => {
                info!("Audio concatenation complete: {:?}", first);
                Ok(())
            }
        }
    }
}
