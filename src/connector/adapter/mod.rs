mod anthropic_client;
mod duckdb_document_repository;
mod file_capture;
mod file_playback;
mod gemini_client;
mod http_speech;
mod in_memory_vector_repository;
mod json_catalog_source;
mod mock_chat_client;
mod mock_embedding;
mod mock_speech;
mod openai_embedding;

pub use anthropic_client::AnthropicClient;
pub use duckdb_document_repository::*;
pub use file_capture::FileAudioCapture;
pub use file_playback::*;
pub use gemini_client::GeminiClient;
pub use http_speech::*;
pub use in_memory_vector_repository::InMemoryVectorRepository;
pub use json_catalog_source::*;
pub use mock_chat_client::*;
pub use mock_embedding::*;
pub use mock_speech::*;
pub use openai_embedding::OpenAiEmbedding;
