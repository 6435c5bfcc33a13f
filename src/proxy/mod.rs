//! Completion proxy: forwards submitted code plus a fixed instruction
//! prompt to an OpenAI-compatible chat-completions provider and relays
//! the Markdown result.
//!
//! The provider credential travels with each request and is never
//! stored, persisted, or logged. Domain enforcement ("Python only") is
//! delegated to the provider; the only authoritative local signal is
//! the sentinel rejection string scanned for in the response text.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Model used when the request doesn't name one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Marker text the provider is instructed to return when the submitted
/// code is not Python.
pub const REJECTION_SENTINEL: &str = "ERROR: This engine only supports Python optimization";

/// Low temperature: optimization output should be reproducible.
const COMPLETION_TEMPERATURE: f64 = 0.2;

const CONNECT_TIMEOUT_SECS: u64 = 5;

const SYSTEM_PROMPT: &str = r#"You are a Python Performance Architect.
REJECT any code that is NOT Python. If the code is not Python, return: "ERROR: This engine only supports Python optimization."
If it IS Python, provide:
1. A 'Pre-Optimization' analysis of Big O complexity.
2. The fully optimized code block (using generators, list comprehensions, built-ins, or better algorithms).
3. A 'Post-Optimization' analysis.
4. Detailed explanation of changes.
Use Markdown."#;

/// Completion proxy failures.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No provider credential was supplied with the request.
    #[error("API Key required")]
    MissingCredential,
    /// Empty code is rejected locally, before any upstream call.
    #[error("Code cannot be empty")]
    EmptyInput,
    /// The provider judged the input out of domain (sentinel detected).
    #[error("Non-Python code detected. This engine is Python-only.")]
    DomainRejected,
    /// Any provider-side failure: timeout, auth rejection, malformed
    /// response. Carries the provider's message.
    #[error("{0}")]
    Upstream(String),
}

// ── Wire types (OpenAI chat-completions) ────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

// ── Proxy client ────────────────────────────────────────────────────

/// HTTP client for the external completion provider.
pub struct CompletionProxy {
    base_url: String,
    client: reqwest::Client,
}

impl CompletionProxy {
    /// Create a proxy against `base_url` (e.g. `https://api.openai.com`).
    ///
    /// `timeout_secs` bounds the whole upstream call; expiry surfaces
    /// as [`ProxyError::Upstream`] instead of hanging the request.
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Forward `code` to the provider under the fixed instruction
    /// prompt and return its Markdown response verbatim.
    ///
    /// `api_key` is used for this one request only.
    pub async fn optimize(
        &self,
        api_key: &str,
        model: &str,
        code: &str,
    ) -> Result<String, ProxyError> {
        if api_key.trim().is_empty() {
            return Err(ProxyError::MissingCredential);
        }
        if code.trim().is_empty() {
            return Err(ProxyError::EmptyInput);
        }

        let model = if model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            model
        };
        let body = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Optimize this Python code:\n\n```python\n{code}\n```"),
                },
            ],
            temperature: COMPLETION_TEMPERATURE,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(ProxyError::Upstream(format!(
                "provider returned {status}: {detail}"
            )));
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ProxyError::Upstream(format!("malformed provider response: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ProxyError::Upstream("provider returned no content".into()));
        }

        if content.contains(REJECTION_SENTINEL) {
            return Err(ProxyError::DomainRejected);
        }

        Ok(content)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
