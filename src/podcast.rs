use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::AudioClip;
use crate::chunker::{self, Boundary};
use crate::config::{AudioConfig, Voices};
use crate::emotion::Emotion;
use crate::episode::EpisodePacker;
use crate::pause::Pauses;
use crate::synth::{self, SpeechSynthesizer, SynthesisRequest};
use crate::tempfiles::TempFiles;
use crate::transcript::{self, Speaker, Turn};

#[derive(Debug, Clone)]
pub struct PodcastSettings {
    pub max_episode_ms: u64,
    pub segment_pause_ms: u64,
    pub batch_size: usize,
    pub max_chunk_chars: usize,
    pub announcements: bool,
    /// `None` disables pauses inside and between chunks of a turn.
    pub pauses: Option<Pauses>,
    pub request_delay: Duration,
    pub retry_delay: Duration,
}

impl From<&AudioConfig> for PodcastSettings {
    fn from(config: &AudioConfig) -> Self {
        Self {
            max_episode_ms: config.max_episode_ms(),
            segment_pause_ms: config.segment_pause_ms,
            batch_size: config.batch_size.max(1),
            max_chunk_chars: config.max_chunk_chars,
            announcements: config.announcements,
            pauses: config.natural_pauses.then_some(Pauses {
                sentence_ms: config.sentence_pause_ms,
                clause_ms: config.clause_pause_ms,
            }),
            request_delay: Duration::from_millis(config.request_delay_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Announcement {
    Intro,
    Outro,
    FinalOutro,
}

impl Announcement {
    fn text(self, episode: usize) -> String {
        match self {
            Announcement::Intro => format!("Welcome back to Part {episode} of our discussion."),
            Announcement::Outro => format!(
                "This concludes Part {episode}. Please continue to the next part for more of our discussion."
            ),
            Announcement::FinalOutro => {
                format!("This concludes Part {episode}, the final part of our discussion.")
            }
        }
    }
}

pub struct PodcastGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voices: Voices,
    settings: PodcastSettings,
    episodes_dir: PathBuf,
    temp_dir: PathBuf,
}

impl PodcastGenerator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voices: Voices,
        settings: PodcastSettings,
        episodes_dir: &Path,
        temp_dir: &Path,
    ) -> Self {
        Self {
            synthesizer,
            voices,
            settings,
            episodes_dir: episodes_dir.to_owned(),
            temp_dir: temp_dir.to_owned(),
        }
    }

    /// Speaks every turn of `text` and returns the episode files written.
    pub async fn generate(&self, text: &str) -> Result<Vec<PathBuf>> {
        let turns = transcript::split_turns(text);
        tracing::info!(turns = turns.len(), "Analyzed conversation structure");

        if turns.is_empty() {
            tracing::warn!("Transcript contains no speaker turns, nothing to synthesize");
            return Ok(Vec::new());
        }

        let mut temp = TempFiles::create(&self.temp_dir).await?;
        let episodes = self.assemble(&turns, &mut temp).await;
        temp.cleanup();

        let episodes = episodes?;
        tracing::info!(
            episodes = episodes.len(),
            directory = %self.episodes_dir.display(),
            "Generated podcast"
        );
        Ok(episodes)
    }

    async fn assemble(&self, turns: &[Turn], temp: &mut TempFiles) -> Result<Vec<PathBuf>> {
        let batch_size = self.settings.batch_size;
        let total_batches = turns.len().div_ceil(batch_size);
        let mut packer = EpisodePacker::new(
            &self.episodes_dir,
            self.settings.max_episode_ms,
            self.settings.segment_pause_ms,
        );

        for (batch_index, batch) in turns.chunks(batch_size).enumerate() {
            tracing::info!(batch = batch_index + 1, total = total_batches, "Processing batch");

            for (offset, turn) in batch.iter().enumerate() {
                let number = batch_index * batch_size + offset + 1;
                let Some(clip) = self.render_turn(number, turn, temp).await else {
                    tracing::warn!(turn = number, "Skipping turn without audio");
                    continue;
                };

                if packer.would_overflow(&clip) {
                    let finished = packer.episode();
                    tracing::info!(
                        episode = finished,
                        duration_ms = packer.buffered_ms(),
                        "Finalizing episode"
                    );
                    let outro = self.announce(Announcement::Outro, finished, temp).await;
                    packer.close_episode(outro.as_ref())?;

                    let intro = self.announce(Announcement::Intro, finished + 1, temp).await;
                    packer.open_episode(intro.as_ref());
                }

                packer.push_turn(&clip);
            }

            temp.release_batch();
        }

        let outro = if packer.has_turns() {
            self.announce(Announcement::FinalOutro, packer.episode(), temp)
                .await
        } else {
            None
        };
        packer.finish(outro.as_ref())
    }

    /// Synthesizes all chunks of a turn and joins them into one clip.
    async fn render_turn(
        &self,
        number: usize,
        turn: &Turn,
        temp: &mut TempFiles,
    ) -> Option<AudioClip> {
        let emotion = Emotion::detect(&turn.text);
        let voice = self.voices.for_speaker(turn.speaker);
        let chunks = chunker::split(&turn.text, self.settings.max_chunk_chars);

        tracing::info!(
            turn = number,
            speaker = %turn.speaker,
            emotion = %emotion,
            chunks = chunks.len(),
            "Generating segment"
        );

        let mut rendered: Option<AudioClip> = None;
        let mut previous = Boundary::Hard;

        for (index, chunk) in chunks.iter().enumerate() {
            let path = temp.segment_path(number, index + 1, chunks.len());
            temp.track(path.clone());

            let request = SynthesisRequest {
                text: &chunk.text,
                voice,
                speed: emotion.speed(),
            };
            let Some(mut clip) = self.speak(&request, &path).await else {
                continue;
            };

            if let Some(pauses) = &self.settings.pauses {
                pauses.insert(&chunk.text, &mut clip);
            }

            let audio = rendered.get_or_insert_with(|| AudioClip::empty(clip.sample_rate()));
            if let Some(pauses) = self.settings.pauses.filter(|_| !audio.is_empty()) {
                audio.append_silence(pauses.after(previous));
            }
            audio.append(&clip);
            previous = chunk.boundary;
        }

        rendered
    }

    async fn announce(
        &self,
        announcement: Announcement,
        episode: usize,
        temp: &mut TempFiles,
    ) -> Option<AudioClip> {
        if !self.settings.announcements {
            return None;
        }

        let path = match announcement {
            Announcement::Intro => temp.intro_path(episode),
            Announcement::Outro | Announcement::FinalOutro => temp.outro_path(episode),
        };
        temp.track(path.clone());

        let text = announcement.text(episode);
        let request = SynthesisRequest {
            text: &text,
            voice: self.voices.for_speaker(Speaker::Host),
            speed: Emotion::Neutral.speed(),
        };
        self.speak(&request, &path).await
    }

    async fn speak(&self, request: &SynthesisRequest<'_>, path: &Path) -> Option<AudioClip> {
        let clip = synth::synthesize_clip(
            self.synthesizer.as_ref(),
            request,
            path,
            self.settings.retry_delay,
        )
        .await?;

        if !self.settings.request_delay.is_zero() {
            tokio::time::sleep(self.settings.request_delay).await;
        }
        Some(clip)
    }
}
