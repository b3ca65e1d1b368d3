//! OpenAI-compatible chat and image generation client.

use super::{ChatCompletion, ChatMessage, ChatProvider, GeneratedImage, ImageProvider, ProviderError};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: i64,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    prompt: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.expose_secret().is_empty()
    }

    /// POST with a bounded retry on transient network failure. Provider
    /// errors (including rate limits) are never retried here; callers
    /// surface them for client-side backoff.
    async fn post_json<R: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<R, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured(
                "OpenAI API key not configured".to_string(),
            ));
        }

        let url = format!("{}{}", self.config.api_base_url, path);
        let mut attempt = 0;

        let response = loop {
            match self
                .client
                .post(&url)
                .bearer_auth(self.config.api_key.expose_secret())
                .json(body)
                .send()
                .await
            {
                Ok(response) => break response,
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt = attempt,
                        "Provider request failed, retrying: {}",
                        e
                    );
                }
                Err(e) => return Err(ProviderError::NetworkError(e.to_string())),
            }
        };

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "Provider request failed");
            return Err(ProviderError::ApiError(format!("{}: {}", status, text)));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::ApiError(format!("Invalid provider response: {}", e)))
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletion, ProviderError> {
        let request = ChatCompletionRequest { model, messages };
        let response: ChatCompletionResponse =
            self.post_json("/chat/completions", &request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ApiError("Response had no choices".to_string()))?;

        Ok(ChatCompletion {
            content,
            total_tokens: response.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}

#[async_trait]
impl ImageProvider for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let request = ImageGenerationRequest { prompt, n: 1 };
        let response: ImageGenerationResponse =
            self.post_json("/images/generations", &request).await?;

        let url = response
            .data
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| ProviderError::ApiError("Response had no images".to_string()))?;

        Ok(GeneratedImage { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_config(api_base_url: &str, max_retries: u32) -> OpenAiConfig {
        OpenAiConfig {
            api_key: Secret::new("test_key".to_string()),
            api_base_url: api_base_url.to_string(),
            default_chat_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 5,
            max_retries,
        }
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Listener that drops the first `drop_first` connections without a
    /// response, then answers every later one with `response`. Returns
    /// the base url and a counter of accepted connections.
    async fn scripted_server(drop_first: u32, response: String) -> (String, Arc<AtomicU32>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicU32::new(0));
        let seen = connections.clone();

        tokio::spawn(async move {
            let mut dropped = 0;
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                seen.fetch_add(1, Ordering::SeqCst);
                if dropped < drop_first {
                    dropped += 1;
                    continue;
                }
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (format!("http://{}", addr), connections)
    }

    const COMPLETION_BODY: &str = r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#;

    fn hello() -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: "user".to_string(),
            content: "hi".to_string(),
        }]
    }

    #[test]
    fn is_configured_requires_an_api_key() {
        let mut config = test_config("https://api.openai.com/v1", 2);
        config.api_key = Secret::new(String::new());
        assert!(!OpenAiClient::new(config).is_configured());
    }

    #[tokio::test]
    async fn retries_dropped_connections_up_to_the_limit() {
        let (url, connections) =
            scripted_server(2, http_response("200 OK", COMPLETION_BODY)).await;
        let client = OpenAiClient::new(test_config(&url, 2));

        let completion = client.complete("gpt-4o-mini", &hello()).await.unwrap();

        assert_eq!(completion.content, "ok");
        assert_eq!(completion.total_tokens, 7);
        assert_eq!(connections.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_once_retries_are_exhausted() {
        let (url, connections) =
            scripted_server(2, http_response("200 OK", COMPLETION_BODY)).await;
        let client = OpenAiClient::new(test_config(&url, 1));

        let err = client.complete("gpt-4o-mini", &hello()).await.unwrap_err();

        assert!(matches!(err, ProviderError::NetworkError(_)));
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limits_are_surfaced_without_retrying() {
        let (url, connections) = scripted_server(0, http_response("429 Too Many Requests", "{}")).await;
        let client = OpenAiClient::new(test_config(&url, 3));

        let err = client.complete("gpt-4o-mini", &hello()).await.unwrap_err();

        assert!(matches!(err, ProviderError::RateLimited));
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_errors_are_surfaced_without_retrying() {
        let (url, connections) = scripted_server(
            0,
            http_response("400 Bad Request", r#"{"error":"bad request"}"#),
        )
        .await;
        let client = OpenAiClient::new(test_config(&url, 3));

        let err = client.complete("gpt-4o-mini", &hello()).await.unwrap_err();

        assert!(matches!(err, ProviderError::ApiError(_)));
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deserializes_chat_completion_response() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "hello");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn deserializes_image_generation_response() {
        let body = r#"{"data": [{"url": "https://img.example/1.png"}]}"#;
        let response: ImageGenerationResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data[0].url, "https://img.example/1.png");
    }
}
