use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatBackend, Message};
use crate::config::LlmConfig;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Groq, or any other OpenAI-compatible chat completions endpoint.
pub struct Groq {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl Groq {
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
impl ChatBackend for Groq {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response: ChatResponse = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to chat completions API")?
            .error_for_status()
            .context("Chat completions API error")?
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("No content in chat completions response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn completions(
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        let authorized = headers
            .get("authorization")
            .is_some_and(|value| value == "Bearer secret");
        if !authorized {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if body["model"] != "llama-3.1-8b-instant" || body["max_tokens"] != 4096 {
            return Err(StatusCode::BAD_REQUEST);
        }

        let echoed = body["messages"][1]["content"].as_str().unwrap_or_default();
        Ok(Json(json!({
            "choices": [{"message": {"role": "assistant", "content": format!("Host: {echoed}")}}]
        })))
    }

    fn backend(base_url: String, api_key: &str) -> Groq {
        Groq::new(
            api_key,
            &LlmConfig {
                base_url: Some(format!("{base_url}/openai/v1")),
                ..LlmConfig::default()
            },
        )
    }

    fn messages() -> Vec<Message> {
        vec![
            Message::new(Role::System, "system"),
            Message::new(Role::User, "Content: transformers"),
        ]
    }

    #[tokio::test]
    async fn returns_first_choice() {
        let base_url = crate::test_support::serve(
            Router::new().route("/openai/v1/chat/completions", post(completions)),
        )
        .await;

        let reply = backend(base_url, "secret").complete(&messages()).await.unwrap();

        assert_eq!(reply, "Host: Content: transformers");
    }

    #[tokio::test]
    async fn http_errors_propagate() {
        let base_url = crate::test_support::serve(
            Router::new().route("/openai/v1/chat/completions", post(completions)),
        )
        .await;

        let error = backend(base_url, "wrong")
            .complete(&messages())
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Chat completions API error");
    }
}
