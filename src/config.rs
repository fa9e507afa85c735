use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::transcript::Speaker;

/// Secrets picked up from the process environment (and `.env`).
#[derive(Deserialize, Debug, Default, Clone)]
pub struct Environment {
    pub groq_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Environment {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        envy::from_env::<Environment>().context("Failed to read environment variables")
    }
}

/// Returns the key or an error naming the missing variable.
pub fn require<'a>(key: &'a Option<String>, variable: &str) -> Result<&'a str> {
    key.as_deref()
        .filter(|key| !key.is_empty())
        .with_context(|| format!("{variable} environment variable not set"))
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    voices: HashMap<String, String>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub tts: TtsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_history: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: 4096,
            max_history: 5,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PdfConfig {
    pub chunk_words: usize,
    pub chunk_overlap: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            chunk_words: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AudioConfig {
    pub max_episode_minutes: u64,
    pub segment_pause_ms: u64,
    pub batch_size: usize,
    pub max_chunk_chars: usize,
    pub announcements: bool,
    pub natural_pauses: bool,
    pub sentence_pause_ms: u64,
    pub clause_pause_ms: u64,
    pub request_delay_ms: u64,
    pub retry_delay_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_episode_minutes: 10,
            segment_pause_ms: 500,
            batch_size: 3,
            max_chunk_chars: 250,
            announcements: true,
            natural_pauses: true,
            sentence_pause_ms: 300,
            clause_pause_ms: 150,
            request_delay_ms: 100,
            retry_delay_ms: 1000,
        }
    }
}

impl AudioConfig {
    pub fn max_episode_ms(&self) -> u64 {
        self.max_episode_minutes * 60 * 1000
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TtsConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Voice ids resolved for both speaker roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voices {
    pub host: String,
    pub expert: String,
}

impl Voices {
    pub fn for_speaker(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Host => &self.host,
            Speaker::Expert => &self.expert,
        }
    }
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(
            &tokio::fs::read_to_string(path)
                .await
                .context("Failed to read config file")?,
        )
        .context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.voices()?;
        ensure!(self.audio.batch_size >= 1, "audio.batch_size must be at least 1");
        ensure!(
            self.audio.max_chunk_chars >= 1,
            "audio.max_chunk_chars must be at least 1"
        );
        ensure!(
            self.audio.max_episode_minutes > 0,
            "audio.max_episode_minutes must be positive"
        );
        ensure!(
            self.pdf.chunk_overlap < self.pdf.chunk_words,
            "pdf.chunk_overlap must be smaller than pdf.chunk_words"
        );
        Ok(())
    }

    pub fn voices(&self) -> Result<Voices> {
        let lookup = |speaker: Speaker| {
            let role = speaker.to_string();
            self.voices.get(&role).cloned().ok_or_else(|| {
                anyhow::anyhow!("No voice ID found for speaker '{role}' in config file")
            })
        };

        Ok(Voices {
            host: lookup(Speaker::Host)?,
            expert: lookup(Speaker::Expert)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Config> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = parse(
            r#"
            [voices]
            host = "rachel"
            expert = "kevin"
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.batch_size, 3);
        assert_eq!(config.audio.max_episode_ms(), 600_000);
        assert_eq!(config.pdf.chunk_words, 500);
        assert_eq!(config.llm.max_history, 5);
        assert!(config.audio.announcements);
        assert_eq!(
            config.voices().unwrap(),
            Voices {
                host: "rachel".into(),
                expert: "kevin".into()
            }
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse(
            r#"
            [voices]
            host = "a"
            expert = "b"

            [audio]
            max_episode_minutes = 5
            announcements = false
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.max_episode_ms(), 300_000);
        assert!(!config.audio.announcements);
        assert_eq!(config.audio.segment_pause_ms, 500);
    }

    #[test]
    fn missing_voice_is_named() {
        let error = parse(
            r#"
            [voices]
            host = "a"
            "#,
        )
        .unwrap_err();

        assert!(error.to_string().contains("expert"));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_window() {
        let error = parse(
            r#"
            [voices]
            host = "a"
            expert = "b"

            [pdf]
            chunk_words = 10
            chunk_overlap = 10
            "#,
        )
        .unwrap_err();

        assert!(error.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn rejects_out_of_range_audio_settings() {
        for (setting, message) in [
            ("batch_size = 0", "audio.batch_size must be at least 1"),
            ("max_chunk_chars = 0", "audio.max_chunk_chars must be at least 1"),
            ("max_episode_minutes = 0", "audio.max_episode_minutes must be positive"),
        ] {
            let error = parse(&format!(
                "[voices]\nhost = \"a\"\nexpert = \"b\"\n\n[audio]\n{setting}\n"
            ))
            .unwrap_err();

            assert_eq!(error.to_string(), message);
        }
    }

    #[test]
    fn require_names_missing_variable() {
        let error = require(&None, "GROQ_API_KEY").unwrap_err();
        assert_eq!(error.to_string(), "GROQ_API_KEY environment variable not set");
        assert_eq!(require(&Some("k".into()), "X").unwrap(), "k");
    }
}
