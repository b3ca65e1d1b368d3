//! Generation-provider abstractions.
//!
//! Trait-based so the OpenAI-backed clients can be swapped for mocks.
//! The providers are opaque remote services; this service only prices and
//! proxies them.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mock::{MockChatProvider, MockImageProvider};
pub use openai::OpenAiClient;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<ProviderError> for crate::error::AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited => crate::error::AppError::UpstreamRateLimited,
            other => crate::error::AppError::ProviderError(other.to_string()),
        }
    }
}

/// One message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Result of a chat completion.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    /// Total tokens billed by the provider for this request.
    pub total_tokens: i64,
}

/// Result of an image generation.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub url: String,
}

/// Chat completion provider (e.g. OpenAI).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletion, ProviderError>;
}

/// Image generation provider.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError>;
}
