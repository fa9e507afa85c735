use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use std::path::Path;

use super::{SpeechSynthesizer, SynthesisRequest};
use crate::audio::AudioClip;
use crate::config::TtsConfig;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";
const OUTPUT_FORMAT: &str = "pcm_22050";
const SAMPLE_RATE: u32 = 22_050;

#[derive(Debug, Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    speed: f32,
}

pub struct ElevenLabs {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model_id: String,
}

impl ElevenLabs {
    pub fn new(api_key: &str, config: &TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_owned(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model_id: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabs {
    async fn synthesize(&self, request: &SynthesisRequest<'_>, path: &Path) -> Result<()> {
        let request_body = ElevenLabsRequest {
            text: request.text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.5,
                // The service only accepts speeds within this range.
                speed: request.speed.clamp(0.7, 1.2),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.base_url.trim_end_matches('/'),
                request.voice
            ))
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to ElevenLabs API")?
            .error_for_status()
            .context("ElevenLabs API error")?;

        let mut pcm = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read chunk from response")?;
            pcm.extend_from_slice(&chunk);
        }

        anyhow::ensure!(!pcm.is_empty(), "ElevenLabs API returned no audio");

        AudioClip::from_pcm_le(&pcm, SAMPLE_RATE).write_wav(path)
    }
}
