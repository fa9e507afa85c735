use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{ConversationCache, ConversationCacheKey};
use crate::config::{Config, Environment};
use crate::conversation::{self, ChatBackend, ConversationGenerator, LlmBackend};
use crate::pdf;
use crate::podcast::{PodcastGenerator, PodcastSettings};
use crate::synth::{self, SpeechSynthesizer, TtsBackend};
use crate::transcript;

type ChatFactory = Box<dyn Fn() -> Result<Box<dyn ChatBackend>> + Send + Sync>;

/// Where one run reads and writes its files.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub transcript: PathBuf,
    pub episodes_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl RunPaths {
    /// The default layout under `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            transcript: root.join("output.txt"),
            episodes_dir: root.join("podcast_episodes"),
            temp_dir: root.join("temp_audio"),
        }
    }
}

pub struct Pipeline {
    config: Config,
    llm: LlmBackend,
    chat: ChatFactory,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cache: Option<ConversationCache>,
}

impl Pipeline {
    pub async fn new(
        config: Config,
        llm: LlmBackend,
        tts: TtsBackend,
        environment: Environment,
    ) -> Result<Self> {
        let synthesizer = synth::build(tts, &config.tts, &environment)?;
        let llm_config = config.llm.clone();
        conversation::build(llm, &llm_config, &environment)?;

        let cache = match ConversationCache::new().await {
            Ok(cache) => Some(cache),
            Err(error) => {
                tracing::warn!("Conversation cache unavailable: {error:#}");
                None
            }
        };

        Ok(Self::with_backends(
            config,
            llm,
            Box::new(move || conversation::build(llm, &llm_config, &environment)),
            synthesizer,
            cache,
        ))
    }

    pub(crate) fn with_backends(
        config: Config,
        llm: LlmBackend,
        chat: ChatFactory,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        cache: Option<ConversationCache>,
    ) -> Self {
        Self {
            config,
            llm,
            chat,
            synthesizer,
            cache,
        }
    }

    /// Runs both stages. An existing transcript at `paths.transcript`
    /// replaces the conversation stage.
    pub async fn run(&self, pdf: &Path, paths: &RunPaths) -> Result<Vec<PathBuf>> {
        let text = if tokio::fs::try_exists(&paths.transcript)
            .await
            .unwrap_or(false)
        {
            tracing::info!(
                transcript = %paths.transcript.display(),
                "Found existing transcript, skipping conversation generation"
            );
            transcript::load(&paths.transcript).await?
        } else {
            let conversations = self.conversations(pdf).await?;
            transcript::save(&conversations, &paths.transcript).await?;
            tracing::info!(transcript = %paths.transcript.display(), "Saved transcript");
            transcript::assemble(&conversations)
        };

        let generator = PodcastGenerator::new(
            self.synthesizer.clone(),
            self.config.voices()?,
            PodcastSettings::from(&self.config.audio),
            &paths.episodes_dir,
            &paths.temp_dir,
        );
        generator.generate(&text).await
    }

    async fn conversations(&self, pdf: &Path) -> Result<Vec<String>> {
        let bytes = tokio::fs::read(pdf)
            .await
            .with_context(|| format!("Failed to read PDF {}", pdf.display()))?;

        let chat = (self.chat)()?;
        let key = ConversationCacheKey::new(&bytes, self.llm, chat.model());

        if let Some(cache) = &self.cache {
            if let Some(conversations) = cache.get(&key).await {
                tracing::info!(sections = conversations.len(), "Using cached conversations");
                return Ok(conversations);
            }
        }

        let chunks = pdf::chunks_from_bytes(
            bytes,
            self.config.pdf.chunk_words,
            self.config.pdf.chunk_overlap,
        )
        .await?;

        tracing::info!(backend = %self.llm, model = chat.model(), "Generating conversations");
        let mut generator = ConversationGenerator::new(chat, self.config.llm.max_history);
        let conversations = generator.generate_all(&chunks).await?;

        if let Some(cache) = &self.cache {
            cache.insert(&key, &conversations).await;
        }
        Ok(conversations)
    }
}
