// Integration tests for the destructive clip operations: concatenation
// and trimming, including their file-disposal contracts.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use voicenote::{
    AudioClip, AudioError, AudioFileStore, AudioSettings, Concatenator, Trimmer, WavExporter,
};

fn write_tone_clip(path: &Path, settings: &AudioSettings, secs: f64) {
    let spec = settings.wav_spec();
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (secs * settings.sample_rate as f64).round() as usize;
    for i in 0..frames {
        let t = i as f32 / settings.sample_rate as f32;
        let sample = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16;
        for _ in 0..settings.channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn setup() -> (TempDir, AudioFileStore, AudioSettings) {
    let dir = TempDir::new().unwrap();
    let store = AudioFileStore::new(dir.path()).unwrap();
    let settings = AudioSettings::default();
    (dir, store, settings)
}

fn idle_flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[tokio::test]
async fn test_concatenate_adds_durations_and_disposes_sources() -> Result<()> {
    let (dir, store, settings) = setup();

    let first = store.resolve_path("first.wav");
    let second = store.resolve_path("second.wav");
    write_tone_clip(&first, &settings, 2.0);
    write_tone_clip(&second, &settings, 1.5);

    let concatenator = Concatenator::new(store.clone(), WavExporter::new(), idle_flag());
    concatenator.concatenate(&first, &second).await?;

    let merged = AudioClip::open(&first)?;
    assert!(
        (merged.duration_seconds - 3.5).abs() < 0.01,
        "got {}s",
        merged.duration_seconds
    );

    // The second file is gone and the merge temp was moved, not orphaned.
    assert!(!second.exists());
    let entries: Vec<_> = fs::read_dir(dir.path())?.collect();
    assert_eq!(entries.len(), 1, "only the merged clip should remain");

    Ok(())
}

#[tokio::test]
async fn test_concatenate_rejected_while_recording() -> Result<()> {
    let (_dir, store, settings) = setup();

    let first = store.resolve_path("first.wav");
    let second = store.resolve_path("second.wav");
    write_tone_clip(&first, &settings, 0.2);
    write_tone_clip(&second, &settings, 0.2);

    let recording = Arc::new(AtomicBool::new(true));
    let concatenator = Concatenator::new(store.clone(), WavExporter::new(), recording.clone());

    let result = concatenator.concatenate(&first, &second).await;
    assert_eq!(result, Err(AudioError::AlreadyRecording));

    // Inputs untouched on rejection.
    assert!(first.exists());
    assert!(second.exists());

    recording.store(false, Ordering::SeqCst);
    concatenator.concatenate(&first, &second).await?;
    Ok(())
}

#[tokio::test]
async fn test_concatenate_missing_input_fails() {
    let (_dir, store, settings) = setup();

    let first = store.resolve_path("first.wav");
    write_tone_clip(&first, &settings, 0.2);

    let concatenator = Concatenator::new(store.clone(), WavExporter::new(), idle_flag());
    let missing = store.resolve_path("missing.wav");

    let result = concatenator.concatenate(&first, &missing).await;
    assert_eq!(result, Err(AudioError::FileNotAvailable));
    assert!(first.exists(), "first clip must survive a failed concatenate");
}

#[tokio::test]
async fn test_trim_shortens_clip_to_offset() -> Result<()> {
    let (_dir, store, settings) = setup();

    let clip_path = store.resolve_path("clip.wav");
    write_tone_clip(&clip_path, &settings, 3.5);
    let before = AudioClip::open(&clip_path)?.samples.len();

    let trimmer = Trimmer::new(store.clone(), WavExporter::new());
    trimmer.trim(&clip_path, 1.0).await?;

    let trimmed = AudioClip::open(&clip_path)?;
    assert!(
        (trimmed.duration_seconds - 1.0).abs() < 0.01,
        "got {}s",
        trimmed.duration_seconds
    );
    // Content beyond the offset is gone for good.
    assert!(trimmed.samples.len() < before);

    Ok(())
}

#[tokio::test]
async fn test_trim_to_full_duration_is_noop() -> Result<()> {
    let (_dir, store, settings) = setup();

    let clip_path = store.resolve_path("clip.wav");
    write_tone_clip(&clip_path, &settings, 1.0);
    let original = AudioClip::open(&clip_path)?;

    let trimmer = Trimmer::new(store.clone(), WavExporter::new());
    trimmer.trim(&clip_path, original.duration_seconds).await?;

    let after = AudioClip::open(&clip_path)?;
    assert_eq!(after.samples.len(), original.samples.len());
    assert!((after.duration_seconds - original.duration_seconds).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn test_trim_clamps_out_of_range_offset() -> Result<()> {
    let (_dir, store, settings) = setup();

    let clip_path = store.resolve_path("clip.wav");
    write_tone_clip(&clip_path, &settings, 1.0);

    let trimmer = Trimmer::new(store.clone(), WavExporter::new());
    trimmer.trim(&clip_path, 10.0).await?;

    let after = AudioClip::open(&clip_path)?;
    assert!((after.duration_seconds - 1.0).abs() < 0.01);

    Ok(())
}

#[tokio::test]
async fn test_trim_removes_stale_temp_first() -> Result<()> {
    let (_dir, store, settings) = setup();

    let clip_path = store.resolve_path("clip.wav");
    write_tone_clip(&clip_path, &settings, 1.0);

    let stale = store.trim_temp_path(&clip_path);
    fs::write(&stale, b"stale export leftovers")?;

    let trimmer = Trimmer::new(store.clone(), WavExporter::new());
    trimmer.trim(&clip_path, 0.5).await?;

    assert!(!stale.exists(), "stale temp should be gone after the trim");
    let after = AudioClip::open(&clip_path)?;
    assert!((after.duration_seconds - 0.5).abs() < 0.01);

    Ok(())
}

#[tokio::test]
async fn test_trim_missing_clip_fails_cleanly() {
    let (_dir, store, _settings) = setup();

    let trimmer = Trimmer::new(store.clone(), WavExporter::new());
    let missing = store.resolve_path("missing.wav");

    let result = trimmer.trim(&missing, 1.0).await;
    assert_eq!(result, Err(AudioError::FileNotAvailable));
}
