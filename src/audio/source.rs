use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::AudioSettings;
use crate::error::AudioError;

/// Audio sample data (16-bit PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// A capture source feeding the recorder.
///
/// Implementations wrap whatever produces audio on the platform
/// (microphone backend, file reader, synthetic generator). The recorder
/// only sees the frame channel.
#[async_trait::async_trait]
pub trait InputSource: Send + Sync {
    /// Begin producing frames; returns the channel they arrive on.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, AudioError>;

    /// Stop producing frames and close the channel.
    async fn stop(&mut self) -> Result<(), AudioError>;

    /// Whether the source is currently producing frames.
    fn is_capturing(&self) -> bool;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Creates one input source per recording segment.
pub trait InputSourceFactory: Send + Sync {
    fn create(&self, settings: &AudioSettings) -> Result<Box<dyn InputSource>, AudioError>;
}

impl<T: InputSourceFactory + ?Sized> InputSourceFactory for Arc<T> {
    fn create(&self, settings: &AudioSettings) -> Result<Box<dyn InputSource>, AudioError> {
        (**self).create(settings)
    }
}

/// Synthetic sine-wave source for the demo binary and tests.
///
/// Produces exactly `duration_secs` of audio. In paced mode frames are
/// emitted in real time and `stop` cuts the capture short; unpaced, the
/// full scripted duration is delivered as fast as the channel drains.
pub struct SineSource {
    sample_rate: u32,
    channels: u16,
    freq_hz: f32,
    amplitude: f32,
    duration_secs: f64,
    frame_ms: u64,
    paced: bool,
    stop_flag: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SineSource {
    pub fn new(settings: &AudioSettings, freq_hz: f32, amplitude: f32, duration_secs: f64) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            freq_hz,
            amplitude,
            duration_secs,
            frame_ms: 50,
            paced: false,
            stop_flag: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Emit frames in real time instead of as fast as possible.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }
}

#[async_trait::async_trait]
impl InputSource for SineSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, AudioError> {
        if self.task.is_some() {
            return Err(AudioError::AlreadyRecording);
        }

        let (tx, rx) = mpsc::channel(64);

        let sample_rate = self.sample_rate;
        let channels = self.channels as usize;
        let freq = self.freq_hz;
        let amplitude = self.amplitude.clamp(0.0, 1.0);
        let frame_ms = self.frame_ms;
        let paced = self.paced;
        let total_frames = (self.duration_secs * sample_rate as f64).round() as u64;
        let frames_per_chunk = (sample_rate as u64 * frame_ms / 1000).max(1);
        let stop_flag = Arc::clone(&self.stop_flag);
        let capturing = Arc::clone(&self.capturing);

        capturing.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            let mut emitted: u64 = 0;
            let mut timestamp_ms: u64 = 0;

            while emitted < total_frames {
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }

                let chunk = frames_per_chunk.min(total_frames - emitted) as usize;
                let mut samples = Vec::with_capacity(chunk * channels);

                for i in 0..chunk {
                    let t = (emitted + i as u64) as f32 / sample_rate as f32;
                    let value = (t * freq * 2.0 * std::f32::consts::PI).sin()
                        * amplitude
                        * i16::MAX as f32;
                    let sample = value as i16;
                    for _ in 0..channels {
                        samples.push(sample);
                    }
                }

                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels: channels as u16,
                    timestamp_ms,
                };

                if tx.send(frame).await.is_err() {
                    break;
                }

                emitted += chunk as u64;
                timestamp_ms += frame_ms;

                if paced {
                    tokio::time::sleep(std::time::Duration::from_millis(frame_ms)).await;
                }
            }

            capturing.store(false, Ordering::SeqCst);
        });

        self.task = Some(task);
        info!(
            "Sine source started: {}Hz tone, {:.2}s scripted",
            self.freq_hz, self.duration_secs
        );

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        if self.paced {
            self.stop_flag.store(true, Ordering::SeqCst);
        }

        if let Some(task) = self.task.take() {
            task.await.map_err(|_| AudioError::InternalError)?;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "sine"
    }
}

/// Factory producing `SineSource`s, with an optional script of segment
/// durations so successive recordings can differ in length.
pub struct SineSourceFactory {
    freq_hz: f32,
    amplitude: f32,
    default_secs: f64,
    paced: bool,
    scripted_secs: Mutex<VecDeque<f64>>,
}

impl SineSourceFactory {
    pub fn new(freq_hz: f32, amplitude: f32, default_secs: f64) -> Self {
        Self {
            freq_hz,
            amplitude,
            default_secs,
            paced: false,
            scripted_secs: Mutex::new(VecDeque::new()),
        }
    }

    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Queue the duration the next created source will produce.
    pub fn script_segment(&self, secs: f64) {
        self.scripted_secs.lock().unwrap().push_back(secs);
    }
}

impl InputSourceFactory for SineSourceFactory {
    fn create(&self, settings: &AudioSettings) -> Result<Box<dyn InputSource>, AudioError> {
        let secs = self
            .scripted_secs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_secs);

        Ok(Box::new(
            SineSource::new(settings, self.freq_hz, self.amplitude, secs).paced(self.paced),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sine_source_emits_scripted_duration() {
        let settings = AudioSettings::default();
        let mut source = SineSource::new(&settings, 440.0, 0.5, 0.5);

        let mut rx = source.start().await.unwrap();
        let mut total_samples = 0usize;
        while let Some(frame) = rx.recv().await {
            assert_eq!(frame.sample_rate, settings.sample_rate);
            assert_eq!(frame.channels, settings.channels);
            total_samples += frame.samples.len();
        }
        source.stop().await.unwrap();

        let expected = (0.5 * settings.sample_rate as f64) as usize * settings.channels as usize;
        assert_eq!(total_samples, expected);
    }

    #[tokio::test]
    async fn test_factory_scripts_segments_in_order() {
        let settings = AudioSettings::default();
        let factory = SineSourceFactory::new(440.0, 0.5, 1.0);
        factory.script_segment(2.0);

        let mut first = factory.create(&settings).unwrap();
        let mut second = factory.create(&settings).unwrap();

        let mut rx = first.start().await.unwrap();
        let mut first_samples = 0usize;
        while let Some(frame) = rx.recv().await {
            first_samples += frame.samples.len();
        }
        first.stop().await.unwrap();

        let mut rx = second.start().await.unwrap();
        let mut second_samples = 0usize;
        while let Some(frame) = rx.recv().await {
            second_samples += frame.samples.len();
        }
        second.stop().await.unwrap();

        // 2.0s scripted segment first, then the 1.0s default.
        assert_eq!(first_samples, second_samples * 2);
    }
}
