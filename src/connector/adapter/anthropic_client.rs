use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::ChatClient;
use crate::domain::{ChatMessage, DomainError, Role, FALLBACK_ANSWER};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-haiku-4-5";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Turn<'a>>,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Default)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: Option<String>,
}

/// Alternative generation provider speaking the Anthropic Messages API,
/// selected with `GENERATION_PROVIDER=anthropic`.
///
/// Self-hosted gateways exposing the same API work through
/// `ANTHROPIC_BASE_URL`. Each call is preceded by a short `HEAD` request so an
/// unreachable host fails in seconds rather than after the full call timeout.
pub struct AnthropicClient {
    client: reqwest::Client,
    reachability: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let build = |builder: reqwest::ClientBuilder| {
            builder
                .build()
                .map_err(|e| DomainError::generation(format!("failed to build HTTP client: {e}")))
        };

        let base: String = base_url.into();
        Ok(Self {
            client: build(reqwest::Client::builder().timeout(timeout))?,
            reachability: build(
                reqwest::Client::builder()
                    .connect_timeout(REACHABILITY_TIMEOUT)
                    .timeout(REACHABILITY_TIMEOUT),
            )?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base.trim_end_matches('/').to_string(),
        })
    }

    /// Reads `ANTHROPIC_API_KEY`, `ANTHROPIC_MODEL` and `ANTHROPIC_BASE_URL`.
    /// Only the key is required.
    pub fn from_env(timeout: Duration) -> Result<Self, DomainError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| DomainError::generation("ANTHROPIC_API_KEY not set"))?;
        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(key, model, base, timeout)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    async fn ensure_reachable(&self) -> Result<(), DomainError> {
        // Any status counts; only connect failures and timeouts mean the host is down.
        match self.reachability.head(format!("{}/", self.base_url)).send().await {
            Err(e) if e.is_connect() || e.is_timeout() => Err(DomainError::generation(format!(
                "server not reachable at {}: {e}",
                self.base_url
            ))),
            _ => Ok(()),
        }
    }
}

fn turns(messages: &[ChatMessage]) -> Vec<Turn<'_>> {
    messages
        .iter()
        .map(|m| Turn {
            role: match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &m.content,
        })
        .collect()
}

fn reply_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .find(|text| !text.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ANSWER.to_string())
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, DomainError> {
        self.ensure_reachable().await?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: turns(messages),
        };

        debug!("Asking {} with {} messages", self.model, messages.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::generation(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Anthropic API returned {status}");
            return Err(DomainError::generation(format!(
                "Anthropic API error: {status} - {body}"
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            DomainError::generation(format!("failed to parse Anthropic response: {e}"))
        })?;

        Ok(reply_text(parsed))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_order_and_roles() {
        let messages = vec![
            ChatMessage::new(Role::User, "Do you have drones?"),
            ChatMessage::new(Role::Assistant, "Yes, the DJI Mini 4 Pro."),
            ChatMessage::new(Role::User, "How much?"),
        ];

        let turns = turns(&messages);
        let roles: Vec<&str> = turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(turns[2].content, "How much?");
    }

    #[test]
    fn reply_skips_blank_blocks_and_falls_back() {
        let response: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(reply_text(response), FALLBACK_ANSWER);

        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use"},{"type":"text","text":"It costs $759."}]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(response), "It costs $759.");
    }

    #[test]
    fn endpoint_is_built_from_base() {
        let client = AnthropicClient::new(
            "key",
            "claude-haiku-4-5",
            "https://api.anthropic.com/",
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(client.endpoint(), "https://api.anthropic.com/v1/messages");
        assert_eq!(client.model_name(), "claude-haiku-4-5");
    }
}
