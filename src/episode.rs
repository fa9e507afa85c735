use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::audio::AudioClip;

/// Accumulates turns into an in-memory episode and flushes it to
/// `episode_{n}.wav` once the next turn would push it past the limit.
pub struct EpisodePacker {
    directory: PathBuf,
    max_duration_ms: u64,
    segment_pause_ms: u64,
    episode: usize,
    buffer: AudioClip,
    turns: usize,
    written: Vec<PathBuf>,
}

impl EpisodePacker {
    pub fn new(directory: &Path, max_duration_ms: u64, segment_pause_ms: u64) -> Self {
        Self {
            directory: directory.to_owned(),
            max_duration_ms,
            segment_pause_ms,
            episode: 1,
            buffer: AudioClip::empty(0),
            turns: 0,
            written: Vec::new(),
        }
    }

    /// Number of the episode currently being filled.
    pub fn episode(&self) -> usize {
        self.episode
    }

    pub fn has_turns(&self) -> bool {
        self.turns > 0
    }

    pub fn buffered_ms(&self) -> u64 {
        self.buffer.duration_ms()
    }

    /// Whether appending `clip` (and the pause before it) would exceed the
    /// maximum. An episode without turns accepts anything, so a turn longer
    /// than the limit ends up alone in its episode.
    pub fn would_overflow(&self, clip: &AudioClip) -> bool {
        self.has_turns()
            && self.buffer.duration_ms() + self.segment_pause_ms + clip.duration_ms()
                > self.max_duration_ms
    }

    pub fn push_turn(&mut self, clip: &AudioClip) {
        self.append_with_pause(clip);
        self.turns += 1;
    }

    /// Seeds the (empty) buffer of the new episode with its intro.
    pub fn open_episode(&mut self, intro: Option<&AudioClip>) {
        if let Some(intro) = intro {
            self.buffer.append(intro);
        }
    }

    /// Appends the outro, writes the episode file and starts the next one.
    pub fn close_episode(&mut self, outro: Option<&AudioClip>) -> Result<PathBuf> {
        if let Some(outro) = outro {
            self.append_with_pause(outro);
        }

        std::fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "Failed to create episodes directory {}",
                self.directory.display()
            )
        })?;
        let path = self.directory.join(format!("episode_{}.wav", self.episode));
        self.buffer
            .write_wav(&path)
            .with_context(|| format!("Failed to save episode {}", self.episode))?;

        tracing::info!(
            episode = self.episode,
            turns = self.turns,
            duration_ms = self.buffer.duration_ms(),
            "Saved episode"
        );

        self.buffer = AudioClip::empty(self.buffer.sample_rate());
        self.turns = 0;
        self.episode += 1;
        self.written.push(path.clone());

        Ok(path)
    }

    /// Closes the last episode if it holds any turns and returns every
    /// episode written, in order.
    pub fn finish(mut self, outro: Option<&AudioClip>) -> Result<Vec<PathBuf>> {
        if self.has_turns() {
            self.close_episode(outro)?;
        }
        Ok(self.written)
    }

    fn append_with_pause(&mut self, clip: &AudioClip) {
        if !self.buffer.is_empty() {
            self.buffer.append_silence(self.segment_pause_ms);
        }
        self.buffer.append(clip);
    }
}
