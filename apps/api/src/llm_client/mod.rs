//! LLM Client: the single point of entry for all chat-completion calls.
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol exposed by Groq.
//! The model is chosen per call because it is a runtime setting.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::GroqConfig;

const MAX_RETRIES: u32 = 3;
/// Low temperature keeps extraction output stable between calls.
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM API key is not configured (set GROQ_API_KEY)")]
    MissingApiKey,

    #[error("LLM call was cancelled")]
    Cancelled,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Returns the content of the first choice, if it has any non-blank text.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat-completion client with retry logic and JSON output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    max_tokens: u32,
    backoff_base: Duration,
}

impl LlmClient {
    pub fn new(config: &GroqConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            max_tokens: config.max_tokens,
            backoff_base: Duration::from_millis(1000),
        })
    }

    /// Makes a raw chat-completion call, returning the full response object.
    /// Retries on 429, 5xx and transport errors with exponential backoff.
    /// Cancelling `cancel` aborts the in-flight request or the backoff sleep.
    pub async fn call(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let request_body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = self.backoff_base * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            debug!(endpoint = %self.endpoint, model, attempt, "Sending chat completion request");

            let send = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&request_body)
                .send();

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                r = send => r,
            };

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                b = response.text() => b?,
            };
            let chat_response: ChatResponse = serde_json::from_str(&body)?;

            if let Some(usage) = &chat_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat_response);
        }

        Err(match last_error {
            Some(LlmError::Api { status: 429, .. }) | None => LlmError::RateLimited {
                retries: MAX_RETRIES,
            },
            Some(other) => other,
        })
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }
}

/// Deserializes model output as JSON, tolerating markdown code fences.
pub fn parse_json_content<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    const OK_BODY: &str = r#"{"choices": [{"message": {"content": "{\"skills\": [\"Rust\"]}"}}]}"#;
    const ERROR_BODY: &str = r#"{"error": {"message": "boom"}}"#;

    /// Local chat-completions endpoint answering each connection with the next
    /// status in `statuses` (the last one repeats). Returns its base URL and a
    /// request counter.
    async fn chat_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses[n.min(statuses.len() - 1)];
                read_request(&mut socket).await;
                let body = if status == 200 { OK_BODY } else { ERROR_BODY };
                let response = format!(
                    "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/v1"), hits)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn client_for(base_url: &str) -> LlmClient {
        let mut config = config(Some("key"));
        config.base_url = base_url.to_string();
        LlmClient::new(&config)
            .unwrap()
            .with_backoff(Duration::from_millis(1))
    }

    fn config(api_key: Option<&str>) -> GroqConfig {
        GroqConfig {
            api_key: api_key.map(String::from),
            // Port 9 (discard) on loopback refuses connections immediately.
            base_url: "http://127.0.0.1:9/v1/".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            timeout_secs: 5,
            max_tokens: 1000,
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_endpoint_joins_base_url_without_double_slash() {
        let client = LlmClient::new(&config(None)).unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:9/v1/chat/completions");
    }

    #[test]
    fn test_response_text_reads_first_choice() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"skills\": [\"Rust\"]}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("{\"skills\": [\"Rust\"]}"));
    }

    #[test]
    fn test_response_text_none_when_no_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_response_text_none_when_content_blank() {
        let json = r#"{"choices": [{"message": {"content": "   "}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn test_call_without_api_key_fails_fast() {
        let client = LlmClient::new(&config(None)).unwrap();
        let err = client
            .call("m", "sys", "prompt", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_call_honors_pre_cancelled_token() {
        let client = LlmClient::new(&config(Some("key"))).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.call("m", "sys", "prompt", &cancel).await.unwrap_err();
        assert!(matches!(err, LlmError::Cancelled));
    }

    #[tokio::test]
    async fn test_call_reports_transport_error_after_retries() {
        let client = LlmClient::new(&config(Some("key")))
            .unwrap()
            .with_backoff(Duration::from_millis(1));
        let err = client
            .call("m", "sys", "prompt", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }

    #[tokio::test]
    async fn test_call_retries_rate_limit_and_server_errors() {
        let (base_url, hits) = chat_server(vec![429, 503, 200]).await;
        let response = client_for(&base_url)
            .call("m", "sys", "prompt", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.text(), Some("{\"skills\": [\"Rust\"]}"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_call_client_error_fails_without_retry() {
        let (base_url, hits) = chat_server(vec![400]).await;
        let err = client_for(&base_url)
            .call("m", "sys", "prompt", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 400, ref message } if message == "boom"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_exhausted_rate_limit_is_reported() {
        let (base_url, hits) = chat_server(vec![429]).await;
        let err = client_for(&base_url)
            .call("m", "sys", "prompt", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::RateLimited { retries: 3 }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_call_exhausted_server_errors_keep_last_status() {
        let (base_url, hits) = chat_server(vec![502]).await;
        let err = client_for(&base_url)
            .call("m", "sys", "prompt", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 502, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
