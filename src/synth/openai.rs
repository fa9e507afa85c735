use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use super::{SpeechSynthesizer, SynthesisRequest};
use crate::audio::AudioClip;
use crate::config::TtsConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "tts-1";
// Raw `pcm` responses are 24 kHz signed 16-bit little-endian mono.
const SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'static str,
}

/// Any server exposing the OpenAI `/audio/speech` endpoint.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSpeech {
    pub fn new(api_key: &str, config: &TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_owned(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, request: &SynthesisRequest<'_>, path: &Path) -> Result<()> {
        let body = SpeechRequest {
            model: &self.model,
            input: request.text,
            voice: request.voice,
            speed: request.speed.clamp(0.25, 4.0),
            response_format: "pcm",
        };

        let pcm = self
            .client
            .post(format!("{}/audio/speech", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to speech API")?
            .error_for_status()
            .context("Speech API error")?
            .bytes()
            .await
            .context("Failed to read speech API response")?;

        anyhow::ensure!(!pcm.is_empty(), "Speech API returned no audio");

        AudioClip::from_pcm_le(&pcm, SAMPLE_RATE).write_wav(path)
    }
}
