use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::conversation::LlmBackend;

/// Identifies the conversations generated for one document by one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationCacheKey {
    pub pdf_hash: String,
    pub backend: LlmBackend,
    pub model: String,
}

impl ConversationCacheKey {
    pub fn new(pdf: &[u8], backend: LlmBackend, model: &str) -> Self {
        Self {
            pdf_hash: compute_pdf_hash(pdf),
            backend,
            model: model.to_owned(),
        }
    }

    fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.pdf_hash, self.backend, self.model)
    }
}

/// Generated conversations stored on disk, so re-running on the same PDF
/// skips the LLM calls.
pub struct ConversationCache {
    cache_dir: PathBuf,
}

impl ConversationCache {
    pub async fn new() -> Result<Self> {
        Self::with_directory(&get_cache_directory()?).await
    }

    pub async fn with_directory(cache_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(cache_dir)
            .await
            .context("Failed to create cache directory")?;

        Ok(Self {
            cache_dir: cache_dir.to_owned(),
        })
    }

    pub async fn get(&self, key: &ConversationCacheKey) -> Option<Vec<String>> {
        match cacache::read(&self.cache_dir, key.cache_key()).await {
            Ok(data) => serde_json::from_slice(&data).ok(),
            Err(_) => None,
        }
    }

    pub async fn insert(&self, key: &ConversationCacheKey, conversations: &[String]) {
        let result = match serde_json::to_vec(conversations) {
            Ok(serialized) => cacache::write(&self.cache_dir, key.cache_key(), serialized)
                .await
                .map(|_| ())
                .map_err(anyhow::Error::from),
            Err(error) => Err(error.into()),
        };

        if let Err(error) = result {
            tracing::warn!("Failed to cache conversations: {error:#}");
        }
    }
}

fn get_cache_directory() -> Result<PathBuf> {
    let cache_base = dirs::cache_dir().context("Failed to determine cache directory")?;
    Ok(cache_base.join(env!("CARGO_CRATE_NAME")))
}

pub fn compute_pdf_hash(pdf: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(pdf);
    format!("{:x}", hasher.finalize())
}
