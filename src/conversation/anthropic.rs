use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatBackend, Message, Role};
use crate::config::LlmConfig;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const PREVIOUS_SEGMENT: &str = "Previous segment:";

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<&'a Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    text: String,
}

pub struct Anthropic {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl Anthropic {
    pub fn new(api_key: &str, config: &LlmConfig) -> Self {
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
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl ChatBackend for Anthropic {
    fn model(&self) -> &str {
        &self.model
    }

    /// The Messages API takes the system prompt as a separate field.
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let system = messages
            .iter()
            .find(|message| message.role == Role::System)
            .map(|message| message.content.as_str());

        let lead_in = Message::new(Role::User, PREVIOUS_SEGMENT);
        let mut turns: Vec<&Message> = messages
            .iter()
            .filter(|message| message.role != Role::System)
            .collect();
        // The conversation has to open with a user turn.
        if turns.first().is_some_and(|message| message.role != Role::User) {
            turns.insert(0, &lead_in);
        }

        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: turns,
        };

        let api_response: AnthropicResponse = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?
            .error_for_status()
            .context("Anthropic API error")?
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        let text = api_response
            .content
            .into_iter()
            .next()
            .context("No content in Anthropic response")?
            .text;

        Ok(text)
    }
}
