//! Mock provider implementations for testing.

use super::{
    ChatCompletion, ChatMessage, ChatProvider, GeneratedImage, ImageProvider, ProviderError,
};
use async_trait::async_trait;

/// Mock chat provider for testing.
pub struct MockChatProvider {
    reply: String,
    total_tokens: i64,
    rate_limited: bool,
}

impl MockChatProvider {
    pub fn new(reply: &str, total_tokens: i64) -> Self {
        Self {
            reply: reply.to_string(),
            total_tokens,
            rate_limited: false,
        }
    }

    /// Provider that reports a rate limit on every call.
    pub fn rate_limited() -> Self {
        Self {
            reply: String::new(),
            total_tokens: 0,
            rate_limited: true,
        }
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
    ) -> Result<ChatCompletion, ProviderError> {
        if self.rate_limited {
            return Err(ProviderError::RateLimited);
        }

        Ok(ChatCompletion {
            content: self.reply.clone(),
            total_tokens: self.total_tokens,
        })
    }
}

/// Mock image provider for testing.
pub struct MockImageProvider {
    url: String,
}

impl MockImageProvider {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, ProviderError> {
        Ok(GeneratedImage {
            url: self.url.clone(),
        })
    }
}
