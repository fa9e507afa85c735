pub(crate) mod anthropic;
pub(crate) mod groq;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use strum::{Display, EnumString};

use crate::config::{Environment, LlmConfig, require};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LlmBackend {
    Groq,
    Anthropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

pub fn build(
    backend: LlmBackend,
    config: &LlmConfig,
    environment: &Environment,
) -> Result<Box<dyn ChatBackend>> {
    Ok(match backend {
        LlmBackend::Groq => Box::new(groq::Groq::new(
            require(&environment.groq_api_key, "GROQ_API_KEY")?,
            config,
        )),
        LlmBackend::Anthropic => Box::new(anthropic::Anthropic::new(
            require(&environment.anthropic_api_key, "ANTHROPIC_API_KEY")?,
            config,
        )),
    })
}

const SYSTEM_PROMPT: &str = r#"You are writing a podcast conversation between a Host (Rachel) and an Expert (Kevin) who discuss a document section by section.

Tone and emotion:
- Let the delivery follow the content: analytical for technical explanations, skeptical for bold claims, excited for striking findings, curious when a new idea comes up.
- Show emotion through wording ("Fascinating...", "Let me walk you through it", "Are we sure about that?").
- Change emotion gradually when the topic changes.

Flow:
- Continue the existing conversation; do not restart it.
- Introduce the speakers only in the very first segment.
- Refer back to earlier points when relevant and use natural transitions.
- Stay technically accurate while keeping the language casual.

Format every line as one of:
Host: <what the host says>
Expert: <what the expert says>"#;

const FIRST_SEGMENT: &str = "This is the first segment. Start with brief introductions.";
const NEXT_SEGMENT: &str = "Continue the ongoing conversation naturally.";

/// Turns document chunks into Host/Expert dialogue, one LLM call per chunk,
/// feeding the previous reply back in so the conversation stays coherent.
pub struct ConversationGenerator {
    backend: Box<dyn ChatBackend>,
    history: VecDeque<String>,
    max_history: usize,
}

impl ConversationGenerator {
    pub fn new(backend: Box<dyn ChatBackend>, max_history: usize) -> Self {
        Self {
            backend,
            history: VecDeque::new(),
            max_history,
        }
    }

    #[cfg(test)]
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub async fn generate(&mut self, chunk: &str, is_first_segment: bool) -> Result<String> {
        let messages = self.messages(chunk, is_first_segment);
        let conversation = self
            .backend
            .complete(&messages)
            .await
            .context("Error generating conversation")?;

        self.remember(conversation.clone());
        Ok(conversation)
    }

    /// Chunks are processed strictly in order: each request carries the
    /// reply to the previous one.
    pub async fn generate_all(&mut self, chunks: &[String]) -> Result<Vec<String>> {
        let mut conversations = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            tracing::info!(section = index + 1, total = chunks.len(), "Generating conversation");
            conversations.push(self.generate(chunk, index == 0).await?);
        }

        Ok(conversations)
    }

    fn messages(&self, chunk: &str, is_first_segment: bool) -> Vec<Message> {
        let context = if is_first_segment {
            FIRST_SEGMENT
        } else {
            NEXT_SEGMENT
        };

        let mut messages = vec![Message::new(Role::System, SYSTEM_PROMPT)];
        if let Some(previous) = self.history.back() {
            messages.push(Message::new(Role::Assistant, previous.as_str()));
        }
        messages.push(Message::new(
            Role::User,
            format!("{context}\n\nContent: {chunk}"),
        ));
        messages
    }

    fn remember(&mut self, conversation: String) {
        self.history.push_back(conversation);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }
}
