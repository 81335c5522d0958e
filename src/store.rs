use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AudioError;

/// Prefix for every file this store creates, so stray recordings are
/// recognizable in the directory.
const CLIP_FILE_PREFIX: &str = "voice-message-";

/// Resolves, creates and deletes on-disk audio file paths.
///
/// Thin collaborator over the local filesystem; it has no audio logic.
/// All operations are synchronous.
#[derive(Debug, Clone)]
pub struct AudioFileStore {
    base_dir: PathBuf,
}

impl AudioFileStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let base_dir = base_dir.into();

        fs::create_dir_all(&base_dir).map_err(|e| {
            warn!("Failed to create store directory {:?}: {}", base_dir, e);
            AudioError::FileNotAvailable
        })?;

        info!("Audio file store rooted at {:?}", base_dir);

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a file name to a path inside the store.
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Allocate a fresh, unique path for a new clip or segment.
    pub fn allocate_clip_path(&self) -> PathBuf {
        self.resolve_path(&format!("{}{}.wav", CLIP_FILE_PREFIX, Uuid::new_v4()))
    }

    /// Allocate a fresh path for a merged concatenation export.
    pub fn merge_temp_path(&self) -> PathBuf {
        self.resolve_path(&format!("{}merge.{}.wav", CLIP_FILE_PREFIX, Uuid::new_v4()))
    }

    /// The deterministic temp path a trim of `original` exports to.
    ///
    /// Deterministic so that a stale temp left by an interrupted trim can
    /// be detected and removed before the next attempt.
    pub fn trim_temp_path(&self, original: &Path) -> PathBuf {
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("clip");
        let parent = original.parent().unwrap_or(&self.base_dir);
        parent.join(format!("{stem}.trim.wav"))
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Remove a file from disk.
    pub fn delete(&self, path: &Path) -> Result<(), AudioError> {
        fs::remove_file(path).map_err(|e| {
            warn!("Failed to delete {:?}: {}", path, e);
            AudioError::FileNotAvailable
        })
    }

    /// Move (rename) a file, replacing any existing file at `to`.
    pub fn move_file(&self, from: &Path, to: &Path) -> Result<(), AudioError> {
        fs::rename(from, to).map_err(|e| {
            warn!("Failed to move {:?} -> {:?}: {}", from, to, e);
            AudioError::FileNotAvailable
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocate_clip_path_is_unique() {
        let dir = TempDir::new().unwrap();
        let store = AudioFileStore::new(dir.path()).unwrap();

        let a = store.allocate_clip_path();
        let b = store.allocate_clip_path();

        assert_ne!(a, b);
        assert!(a.to_string_lossy().contains(CLIP_FILE_PREFIX));
        assert_eq!(a.extension().unwrap(), "wav");
    }

    #[test]
    fn test_trim_temp_path_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let store = AudioFileStore::new(dir.path()).unwrap();

        let clip = store.resolve_path("voice-message-abc.wav");
        let t1 = store.trim_temp_path(&clip);
        let t2 = store.trim_temp_path(&clip);

        assert_eq!(t1, t2);
        assert!(t1.to_string_lossy().ends_with(".trim.wav"));
    }

    #[test]
    fn test_delete_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let store = AudioFileStore::new(dir.path()).unwrap();

        let missing = store.resolve_path("nope.wav");
        assert_eq!(store.delete(&missing), Err(AudioError::FileNotAvailable));
    }

    #[test]
    fn test_move_replaces_target() {
        let dir = TempDir::new().unwrap();
        let store = AudioFileStore::new(dir.path()).unwrap();

        let from = store.resolve_path("a.wav");
        let to = store.resolve_path("b.wav");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        store.move_file(&from, &to).unwrap();

        assert!(!store.exists(&from));
        assert_eq!(fs::read(&to).unwrap(), b"new");
    }
}
