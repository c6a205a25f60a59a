//! HTTP surface: `/chat`, `/text-to-speech`, `/speech-to-text` and
//! `/match-documents`, each a JSON request/response pair. Failures are returned
//! as `{ "error": "..." }`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::domain::{
    render_content, AudioBuffer, CatalogRecord, ChatMessage, DomainError, RetrievalQuery, Role,
    DEFAULT_MATCH_COUNT, DEFAULT_MATCH_THRESHOLD,
};

use super::Container;

/// Error body shared by every endpoint.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let status = match &e {
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<DomainError>() {
            Ok(domain) => domain.into(),
            Err(other) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub product_context: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    pub audio_content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionRequest {
    pub audio: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

fn default_match_threshold() -> f32 {
    DEFAULT_MATCH_THRESHOLD
}

fn default_match_count() -> usize {
    DEFAULT_MATCH_COUNT
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub query_embedding: Vec<f32>,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    #[serde(default = "default_match_count")]
    pub match_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MatchedDocument {
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub similarity: f32,
}

/// Render caller-supplied catalog records into fallback context. Entries that
/// are not records are skipped.
fn product_context(records: &[Value]) -> Option<String> {
    let rendered: Vec<String> = records
        .iter()
        .filter_map(|v| serde_json::from_value::<CatalogRecord>(v.clone()).ok())
        .filter(|r| !r.name.trim().is_empty())
        .map(|r| render_content(&r))
        .collect();

    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join("\n\n"))
    }
}

pub async fn chat(
    State(container): State<Arc<Container>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }

    let history: Vec<ChatMessage> = request
        .conversation_history
        .iter()
        .map(|m| ChatMessage::new(Role::parse(&m.role), m.content.clone()))
        .collect();

    let use_case = container.answer_use_case()?;
    let answer = use_case
        .answer_with_fallback(
            &request.message,
            &history,
            product_context(&request.product_context),
        )
        .await?;

    Ok(Json(ChatResponse {
        response: answer.text,
    }))
}

pub async fn text_to_speech(
    State(container): State<Arc<Container>>,
    Json(request): Json<SpeechRequest>,
) -> Result<Json<SpeechResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("Text is required"));
    }

    info!("TTS request: {} chars", request.text.len());
    let synthesizer = container.synthesizer_with_voice(request.voice.as_deref())?;
    let audio = synthesizer.synthesize(&request.text).await?;

    Ok(Json(SpeechResponse {
        audio_content: audio.to_base64(),
    }))
}

pub async fn speech_to_text(
    State(container): State<Arc<Container>>,
    Json(request): Json<TranscriptionRequest>,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let bytes = STANDARD
        .decode(request.audio.trim())
        .map_err(|e| ApiError::bad_request(format!("invalid audio payload: {}", e)))?;
    let mime_type = request.mime_type.unwrap_or_else(|| "audio/webm".to_string());

    let transcriber = container.transcriber()?;
    let text = transcriber
        .transcribe(&AudioBuffer::new(bytes, mime_type))
        .await?;

    Ok(Json(TranscriptionResponse { text }))
}

pub async fn match_documents(
    State(container): State<Arc<Container>>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<Vec<MatchedDocument>>, ApiError> {
    if request.query_embedding.is_empty() {
        return Err(ApiError::bad_request("query_embedding is required"));
    }

    let query = RetrievalQuery::new()
        .with_k(request.match_count)
        .with_threshold(request.match_threshold);
    let results = container
        .vector_repo()
        .search(&request.query_embedding, &query)
        .await?;

    Ok(Json(
        results
            .into_iter()
            .map(|scored| {
                let similarity = scored.similarity();
                let document = scored.into_document();
                MatchedDocument {
                    id: document.id().to_string(),
                    content: document.content().to_string(),
                    metadata: document.metadata().clone(),
                    similarity,
                }
            })
            .collect(),
    ))
}

pub struct HttpServer;

impl HttpServer {
    pub fn router(container: Arc<Container>) -> axum::Router {
        axum::Router::new()
            .route("/chat", post(chat))
            .route("/text-to-speech", post(text_to_speech))
            .route("/speech-to-text", post(speech_to_text))
            .route("/match-documents", post(match_documents))
            .with_state(container)
    }
}

pub async fn serve(container: Arc<Container>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, HttpServer::router(container)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::api::ContainerConfig;
    use crate::domain::build_document;

    async fn mock_container() -> Arc<Container> {
        let config = ContainerConfig {
            mock_services: true,
            memory_storage: true,
            ..ContainerConfig::default()
        };
        Arc::new(Container::new(config).await.unwrap())
    }

    #[test]
    fn domain_errors_map_to_status_codes() {
        let err: ApiError = DomainError::invalid_input("bad").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = DomainError::generation("down").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("down"));
    }

    #[test]
    fn product_context_renders_records_and_skips_garbage() {
        let context = product_context(&[
            json!({"name": "Widget", "price": 10, "inStock": true}),
            json!("not a record"),
        ])
        .unwrap();

        assert!(context.starts_with("Product: Widget"));
        assert!(product_context(&[json!(42)]).is_none());
    }

    #[tokio::test]
    async fn chat_uses_product_context_when_index_is_empty() {
        let container = mock_container().await;
        let request: ChatRequest = serde_json::from_value(json!({
            "message": "What do you sell?",
            "conversationHistory": [{"role": "assistant", "content": "Hi!"}],
            "productContext": [{"name": "Widget", "price": 10}]
        }))
        .unwrap();

        let Json(response) = chat(State(container), Json(request)).await.unwrap();
        assert!(response.response.contains("Widget"));
    }

    #[tokio::test]
    async fn empty_tts_text_is_bad_request() {
        let container = mock_container().await;
        let request = SpeechRequest {
            text: "  ".to_string(),
            voice: None,
        };

        let err = text_to_speech(State(container), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Text is required");
    }

    #[tokio::test]
    async fn tts_returns_base64_audio() {
        let container = mock_container().await;
        let request = SpeechRequest {
            text: "hello".to_string(),
            voice: Some("alloy".to_string()),
        };

        let Json(response) = text_to_speech(State(container), Json(request)).await.unwrap();
        assert_eq!(response.audio_content, STANDARD.encode("hello"));
    }

    #[tokio::test]
    async fn stt_rejects_invalid_base64() {
        let container = mock_container().await;
        let request = TranscriptionRequest {
            audio: "***".to_string(),
            mime_type: None,
        };

        let err = speech_to_text(State(container), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn match_documents_returns_scored_rows() {
        let container = mock_container().await;
        let record = CatalogRecord::new("Widget", 10.0).with_id("w-1");
        let document = build_document(&record).with_embedding(vec![1.0, 0.0]);
        container.vector_repo().upsert_all(&[document]).await.unwrap();

        let request: MatchRequest =
            serde_json::from_value(json!({"query_embedding": [1.0, 0.0]})).unwrap();
        let Json(rows) = match_documents(State(container), Json(request)).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].content.starts_with("Product: Widget"));
        assert_eq!(rows[0].metadata["productId"], "w-1");
        assert!((rows[0].similarity - 1.0).abs() < 1e-5);
    }
}
