use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Intermediate WAV files of one run.
///
/// Files are registered as they are produced and deleted batch by batch
/// once their audio sits in the episode buffer. Whatever is left, and the
/// directory itself, goes away in [`TempFiles::cleanup`] or on drop.
pub struct TempFiles {
    directory: PathBuf,
    batch: Vec<PathBuf>,
    cleaned: bool,
}

impl TempFiles {
    pub async fn create(directory: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(directory)
            .await
            .with_context(|| format!("Failed to create temp directory {}", directory.display()))?;

        Ok(Self {
            directory: directory.to_owned(),
            batch: Vec::new(),
            cleaned: false,
        })
    }

    /// `segment_{turn}.wav`, or `segment_{turn}_{chunk}.wav` when the turn
    /// was split into several chunks. Both indices are 1-based.
    pub fn segment_path(&self, turn: usize, chunk: usize, chunks: usize) -> PathBuf {
        if chunks > 1 {
            self.directory.join(format!("segment_{turn}_{chunk}.wav"))
        } else {
            self.directory.join(format!("segment_{turn}.wav"))
        }
    }

    pub fn intro_path(&self, episode: usize) -> PathBuf {
        self.directory.join(format!("intro_{episode}.wav"))
    }

    pub fn outro_path(&self, episode: usize) -> PathBuf {
        self.directory.join(format!("outro_{episode}.wav"))
    }

    pub fn track(&mut self, path: PathBuf) {
        if !self.batch.contains(&path) {
            self.batch.push(path);
        }
    }

    #[cfg(test)]
    pub fn tracked(&self) -> &[PathBuf] {
        &self.batch
    }

    /// Deletes every file tracked since the previous release.
    pub fn release_batch(&mut self) {
        for path in self.batch.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    tracing::warn!(path = %path.display(), "Error removing temporary file: {error}");
                }
            }
        }
    }

    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        tracing::debug!(directory = %self.directory.display(), "Cleaning up temporary files");
        self.release_batch();
        if let Err(error) = std::fs::remove_dir(&self.directory) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    directory = %self.directory.display(),
                    "Could not remove temp directory: {error}"
                );
            }
        }
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}
