use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::{Synthesizer, Transcriber};
use crate::domain::{AudioBuffer, DomainError, SynthesizedAudio};

pub const DEFAULT_VOICE: &str = "alloy";
const SPEECH_TO_TEXT_PATH: &str = "/speech-to-text";
const TEXT_TO_SPEECH_PATH: &str = "/text-to-speech";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptionRequest<'a> {
    audio: String,
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    #[serde(default)]
    audio_content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Shared transport for the speech endpoints.
///
/// | Variable          | Default  |
/// |-------------------|----------|
/// | `SPEECH_BASE_URL` | required |
/// | `SPEECH_API_KEY`  | none     |
/// | `TTS_VOICE`       | `alloy`  |
#[derive(Clone)]
pub struct SpeechEndpoint {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SpeechEndpoint {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let base: String = base_url.into();
        if base.trim().is_empty() {
            return Err(DomainError::invalid_input("speech base URL not set"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base.trim().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn from_env(timeout: Duration) -> Result<Self, DomainError> {
        let base = std::env::var("SPEECH_BASE_URL").unwrap_or_default();
        let key = std::env::var("SPEECH_API_KEY").ok();
        Self::new(base, key, timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<Req: Serialize + Sync>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<reqwest::Response, String> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Speech endpoint {path} returned {status}: {body}");
            return Err(format!("HTTP {status}: {}", error_message(&body)));
        }
        Ok(response)
    }
}

/// Pull `error` out of a JSON error body, or fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Speech-to-text over `POST /speech-to-text` (`{ audio }` → `{ text }`).
pub struct HttpTranscriber {
    endpoint: SpeechEndpoint,
}

impl HttpTranscriber {
    pub fn new(endpoint: SpeechEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &AudioBuffer) -> Result<String, DomainError> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        let request = TranscriptionRequest {
            audio: audio.to_base64(),
            mime_type: audio.mime_type(),
        };

        let response = self
            .endpoint
            .post(SPEECH_TO_TEXT_PATH, &request)
            .await
            .map_err(DomainError::transcription)?;

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| DomainError::transcription(format!("failed to parse response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(DomainError::transcription(error));
        }

        let text = parsed.text.unwrap_or_default();
        debug!("Transcribed {} bytes into {} chars", audio.len(), text.len());
        Ok(text)
    }
}

/// Text-to-speech over `POST /text-to-speech` (`{ text, voice }` → `{ audioContent }`).
pub struct HttpSynthesizer {
    endpoint: SpeechEndpoint,
    voice: String,
}

impl HttpSynthesizer {
    pub fn new(endpoint: SpeechEndpoint, voice: impl Into<String>) -> Self {
        Self {
            endpoint,
            voice: voice.into(),
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::synthesis("Text is required"));
        }

        let request = SynthesisRequest {
            text,
            voice: &self.voice,
        };

        let response = self
            .endpoint
            .post(TEXT_TO_SPEECH_PATH, &request)
            .await
            .map_err(DomainError::synthesis)?;

        let parsed: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| DomainError::synthesis(format!("failed to parse response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(DomainError::synthesis(error));
        }

        let encoded = parsed
            .audio_content
            .ok_or_else(|| DomainError::synthesis("response carried no audioContent"))?;

        let audio = SynthesizedAudio::from_base64(&encoded, self.voice.clone())?;
        if audio.is_empty() {
            return Err(DomainError::synthesis("response carried empty audio"));
        }

        debug!("Synthesized {} chars into {} bytes", text.len(), audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_error_field() {
        assert_eq!(error_message(r#"{"error":"Text is required"}"#), "Text is required");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn endpoint_requires_base_url() {
        assert!(SpeechEndpoint::new(" ", None, Duration::from_secs(1)).is_err());

        let endpoint =
            SpeechEndpoint::new("http://localhost:9000/", Some(String::new()), Duration::from_secs(1))
                .unwrap();
        assert_eq!(endpoint.url(TEXT_TO_SPEECH_PATH), "http://localhost:9000/text-to-speech");
        assert!(endpoint.api_key.is_none());
    }

    #[test]
    fn synthesis_request_uses_wire_field_names() {
        let value = serde_json::to_value(SynthesisRequest {
            text: "hello",
            voice: DEFAULT_VOICE,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"text": "hello", "voice": "alloy"}));

        let parsed: SynthesisResponse =
            serde_json::from_str(r#"{"audioContent":"aGVsbG8="}"#).unwrap();
        assert_eq!(parsed.audio_content.as_deref(), Some("aGVsbG8="));
    }

    #[tokio::test]
    async fn empty_audio_transcribes_to_empty_text() {
        let endpoint =
            SpeechEndpoint::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let transcriber = HttpTranscriber::new(endpoint);

        let text = transcriber
            .transcribe(&AudioBuffer::new(Vec::new(), "audio/webm"))
            .await
            .unwrap();
        assert!(text.is_empty());
    }
}
