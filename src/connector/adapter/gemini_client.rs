use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::ChatClient;
use crate::domain::{ChatMessage, DomainError, Role, FALLBACK_ANSWER};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const TEMPERATURE: f32 = 0.7;
const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            top_k: TOP_K,
            top_p: TOP_P,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Client for Gemini `generateContent`, the default generation provider.
///
/// Assistant turns are sent with the provider's `model` role. A response with
/// no usable candidate text yields [`FALLBACK_ANSWER`].
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DomainError::generation("Gemini API key not set"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::generation(format!("failed to build HTTP client: {e}")))?;

        let base: String = base_url.into();
        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: base.trim_end_matches('/').to_string(),
        })
    }

    /// Reads `GEMINI_API_KEY` (required), `GEMINI_MODEL` and `GEMINI_BASE_URL`.
    pub fn from_env(timeout: Duration) -> Result<Self, DomainError> {
        let key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(key, model, base, timeout)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn build_request<'a>(system: &'a str, messages: &'a [ChatMessage]) -> GenerateRequest<'a> {
    let contents = messages
        .iter()
        .map(|m| Content {
            role: match m.role {
                Role::User => "user",
                Role::Assistant => "model",
            },
            parts: vec![Part { text: &m.content }],
        })
        .collect();

    GenerateRequest {
        contents,
        system_instruction: SystemInstruction {
            parts: vec![Part { text: system }],
        },
        generation_config: GenerationConfig::default(),
    }
}

fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ANSWER.to_string())
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, DomainError> {
        let request = build_request(system, messages);
        debug!("Sending {} messages to {}", messages.len(), self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::generation(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {status}: {body}");
            return Err(DomainError::generation(format!(
                "Gemini API error: {status} - {body}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DomainError::generation(format!("failed to parse response: {e}")))?;

        Ok(extract_text(parsed))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
