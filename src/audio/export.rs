use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AudioError;

/// Terminal status of an export attempt.
///
/// Callers map the status to an error kind so they can decide whether a
/// retry makes sense; only `Completed` means the output file exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Completed,
    Failed,
    Cancelled,
    Unknown,
    Waiting,
    Exporting,
}

impl ExportStatus {
    /// Map a terminal status to the operation result.
    pub fn into_result(self) -> Result<(), AudioError> {
        match self {
            Self::Completed => Ok(()),
            Self::Failed => Err(AudioError::ExportFailed),
            Self::Cancelled => Err(AudioError::ExportCancelled),
            Self::Unknown => Err(AudioError::ExportUnknown),
            Self::Waiting => Err(AudioError::ExportWaiting),
            Self::Exporting => Err(AudioError::ExportExporting),
        }
    }
}

/// Writes PCM samples to a WAV file off the async runtime.
///
/// At most one export runs at a time; a second concurrent request
/// observes `Exporting` without touching the disk. The status is only
/// reported once the write has actually finished, never before.
#[derive(Clone, Default)]
pub struct WavExporter {
    in_flight: Arc<AtomicBool>,
}

impl WavExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Export `samples` to `path`, returning the terminal status.
    pub async fn export(
        &self,
        path: PathBuf,
        spec: hound::WavSpec,
        samples: Vec<i16>,
    ) -> ExportStatus {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Export requested while another export is in flight");
            return ExportStatus::Exporting;
        }

        let target = path.clone();
        let status = match tokio::task::spawn_blocking(move || write_wav(&target, spec, &samples))
            .await
        {
            Ok(Ok(())) => {
                info!("Export complete: {:?}", path);
                ExportStatus::Completed
            }
            Ok(Err(e)) => {
                warn!("Export to {:?} failed: {}", path, e);
                ExportStatus::Failed
            }
            Err(join_err) if join_err.is_cancelled() => {
                warn!("Export to {:?} was cancelled", path);
                ExportStatus::Cancelled
            }
            Err(join_err) => {
                warn!("Export task to {:?} ended abnormally: {}", path, join_err);
                ExportStatus::Unknown
            }
        };

        self.in_flight.store(false, Ordering::SeqCst);
        status
    }
}

fn write_wav(path: &Path, spec: hound::WavSpec, samples: &[i16]) -> hound::Result<()> {
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_spec() -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[tokio::test]
    async fn test_export_writes_playable_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");

        let exporter = WavExporter::new();
        let status = exporter
            .export(path.clone(), test_spec(), vec![1, 2, 3, 4])
            .await;

        assert_eq!(status, ExportStatus::Completed);
        assert!(status.into_result().is_ok());

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 4);
    }

    #[tokio::test]
    async fn test_export_to_bad_path_fails() {
        let exporter = WavExporter::new();
        let status = exporter
            .export(PathBuf::from("/nonexistent/dir/out.wav"), test_spec(), vec![0])
            .await;

        assert_eq!(status, ExportStatus::Failed);
        assert_eq!(status.into_result(), Err(AudioError::ExportFailed));
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            ExportStatus::Cancelled.into_result(),
            Err(AudioError::ExportCancelled)
        );
        assert_eq!(
            ExportStatus::Unknown.into_result(),
            Err(AudioError::ExportUnknown)
        );
        assert_eq!(
            ExportStatus::Waiting.into_result(),
            Err(AudioError::ExportWaiting)
        );
        assert_eq!(
            ExportStatus::Exporting.into_result(),
            Err(AudioError::ExportExporting)
        );
    }
}
