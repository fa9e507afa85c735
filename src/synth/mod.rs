pub(crate) mod elevenlabs;
pub(crate) mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::audio::AudioClip;
use crate::config::{Environment, TtsConfig, require};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TtsBackend {
    ElevenLabs,
    OpenAi,
}

#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    pub speed: f32,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Writes the spoken `request` to `path` as a WAV file.
    async fn synthesize(&self, request: &SynthesisRequest<'_>, path: &Path) -> Result<()>;
}

pub fn build(
    backend: TtsBackend,
    config: &TtsConfig,
    environment: &Environment,
) -> Result<Arc<dyn SpeechSynthesizer>> {
    Ok(match backend {
        TtsBackend::ElevenLabs => Arc::new(elevenlabs::ElevenLabs::new(
            require(&environment.elevenlabs_api_key, "ELEVENLABS_API_KEY")?,
            config,
        )),
        TtsBackend::OpenAi => Arc::new(openai::OpenAiSpeech::new(
            require(&environment.openai_api_key, "OPENAI_API_KEY")?,
            config,
        )),
    })
}

/// Synthesizes and decodes one clip, retrying once after `retry_delay`.
///
/// Returns `None` when both attempts fail; the failure is logged and the
/// caller is expected to carry on without this piece of audio.
pub async fn synthesize_clip(
    synthesizer: &dyn SpeechSynthesizer,
    request: &SynthesisRequest<'_>,
    path: &Path,
    retry_delay: Duration,
) -> Option<AudioClip> {
    match attempt(synthesizer, request, path).await {
        Ok(clip) => return Some(clip),
        Err(error) => {
            tracing::warn!(path = %path.display(), "Synthesis failed, retrying: {error:#}");
        }
    }

    tokio::time::sleep(retry_delay).await;

    match attempt(synthesizer, request, path).await {
        Ok(clip) => Some(clip),
        Err(error) => {
            tracing::error!(path = %path.display(), "Second synthesis attempt failed: {error:#}");
            None
        }
    }
}

async fn attempt(
    synthesizer: &dyn SpeechSynthesizer,
    request: &SynthesisRequest<'_>,
    path: &Path,
) -> Result<AudioClip> {
    synthesizer.synthesize(request, path).await?;
    AudioClip::read_wav(path)
}
