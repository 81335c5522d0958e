use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::source::InputSource;
use crate::config::AudioSettings;
use crate::error::AudioError;

/// Answers the platform's record-permission prompt.
///
/// Injected into the recorder so the permission flow is an explicit
/// collaborator rather than process-global state. A probe that never
/// responds is treated as a denial after the configured timeout.
#[async_trait::async_trait]
pub trait PermissionProbe: Send + Sync {
    async fn request(&self) -> bool;
}

/// Probe that always grants; for platforms without a permission prompt.
pub struct GrantAll;

#[async_trait::async_trait]
impl PermissionProbe for GrantAll {
    async fn request(&self) -> bool {
        true
    }
}

/// Owns the capture session: one WAV file per `start` call, with a
/// periodic metering task reporting normalized input amplitude.
pub struct Recorder {
    settings: AudioSettings,
    meter_tx: mpsc::UnboundedSender<f32>,
    probe: Box<dyn PermissionProbe>,
    permission_granted: bool,
    recording: Arc<AtomicBool>,
    active: Option<ActiveRecording>,
    last_record_path: Option<PathBuf>,
}

struct ActiveRecording {
    path: PathBuf,
    source: Box<dyn InputSource>,
    writer_task: JoinHandle<Result<u64, AudioError>>,
    meter_task: JoinHandle<()>,
}

impl Recorder {
    pub fn new(
        settings: AudioSettings,
        meter_tx: mpsc::UnboundedSender<f32>,
        probe: Box<dyn PermissionProbe>,
    ) -> Self {
        Self {
            settings,
            meter_tx,
            probe,
            permission_granted: false,
            recording: Arc::new(AtomicBool::new(false)),
            active: None,
            last_record_path: None,
        }
    }

    /// Whether a capture session is active right now.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Shared flag other components use to check the idle precondition.
    pub fn recording_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.recording)
    }

    /// Ask for record permission; fails closed if the probe never answers.
    ///
    /// A grant is cached; a denial is re-asked on the next attempt.
    pub async fn request_permission(&mut self) -> bool {
        if self.permission_granted {
            return true;
        }

        let granted = tokio::time::timeout(self.settings.permission_timeout, self.probe.request())
            .await
            .unwrap_or(false);

        if !granted {
            warn!("Record permission not granted");
        }

        self.permission_granted = granted;
        granted
    }

    /// Begin capturing from `source` into a WAV file at `target`.
    pub async fn start(
        &mut self,
        target: &Path,
        mut source: Box<dyn InputSource>,
    ) -> Result<(), AudioError> {
        if self.active.is_some() {
            return Err(AudioError::AlreadyRecording);
        }
        if !self.permission_granted {
            return Err(AudioError::PermissionDenied);
        }

        let writer = hound::WavWriter::create(target, self.settings.wav_spec()).map_err(|e| {
            warn!("Failed to create recording file {:?}: {}", target, e);
            AudioError::RecordFailed
        })?;

        let mut rx = source.start().await?;

        self.recording.store(true, Ordering::SeqCst);

        let level = Arc::new(Mutex::new(0.0f32));
        let channels = self.settings.channels as u64;

        let writer_level = Arc::clone(&level);
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            let mut samples_written: u64 = 0;

            while let Some(frame) = rx.recv().await {
                for &sample in &frame.samples {
                    if let Err(e) = writer.write_sample(sample) {
                        warn!("Failed to write sample: {}", e);
                        return Err(AudioError::RecordFailed);
                    }
                }
                samples_written += frame.samples.len() as u64;
                *writer_level.lock().unwrap() = meter_level(&frame.samples);
            }

            writer.finalize().map_err(|e| {
                warn!("Failed to finalize recording: {}", e);
                AudioError::RecordFailed
            })?;

            Ok(samples_written / channels.max(1))
        });

        let meter_tx = self.meter_tx.clone();
        let meter_level_shared = Arc::clone(&level);
        let meter_flag = Arc::clone(&self.recording);
        let metering_interval = self.settings.metering_interval;
        let meter_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(metering_interval);
            loop {
                ticker.tick().await;
                // A tick with no active session is a no-op, not an error.
                if !meter_flag.load(Ordering::SeqCst) {
                    break;
                }
                let current = *meter_level_shared.lock().unwrap();
                if meter_tx.send(current).is_err() {
                    break;
                }
            }
        });

        info!("Recorder started, capturing to {:?}", target);

        self.last_record_path = Some(target.to_path_buf());
        self.active = Some(ActiveRecording {
            path: target.to_path_buf(),
            source,
            writer_task,
            meter_task,
        });

        Ok(())
    }

    /// Stop capturing, finalize the file, return the captured duration.
    pub async fn stop(&mut self) -> Result<f64, AudioError> {
        let mut active = self
            .active
            .take()
            .ok_or(AudioError::NotCurrentlyRecording)?;

        self.recording.store(false, Ordering::SeqCst);

        active.source.stop().await?;

        let frames = match active.writer_task.await {
            Ok(result) => result?,
            Err(e) => {
                error!("Recording writer task panicked: {}", e);
                return Err(AudioError::InternalError);
            }
        };

        active.meter_task.abort();
        let _ = active.meter_task.await;

        let duration = frames as f64 / self.settings.sample_rate as f64;
        info!(
            "Recorder stopped: {:?} ({:.2}s captured)",
            active.path, duration
        );

        Ok(duration)
    }

    /// Discard the most recent (stopped) recording file.
    pub fn reset(&mut self) -> Result<(), AudioError> {
        if self.active.is_some() {
            warn!("Tried to discard a recording before stopping it");
            return Err(AudioError::AlreadyRecording);
        }

        if let Some(path) = self.last_record_path.take() {
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| {
                    warn!("Failed to discard recording {:?}: {}", path, e);
                    AudioError::FileNotAvailable
                })?;
            }
            info!("Discarded recording {:?}", path);
        }

        Ok(())
    }
}

/// Normalized input amplitude in 0.0-1.0, computed from the average
/// power of the frame: `10^(0.05 * average_power_db)`.
fn meter_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64;
            v * v
        })
        .sum();
    let rms = (sum_squares / samples.len() as f64).sqrt();

    if rms <= 0.0 {
        return 0.0;
    }

    let average_power_db = 20.0 * (rms / i16::MAX as f64).log10();
    10f64.powf(0.05 * average_power_db) as f32
}
