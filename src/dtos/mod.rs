//! HTTP request/response DTOs.

use crate::services::providers::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model override; the configured default is used when absent.
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub tokens_used: i64,
    /// Clamped to zero; -1 means unlimited.
    pub tokens_remaining: i64,
}

#[derive(Debug, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct ImageGenerationResponse {
    pub url: String,
    pub tokens_used: i64,
    pub tokens_remaining: i64,
}
