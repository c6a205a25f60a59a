//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Storage (DuckDB file or in-memory document index)
//! - Embeddings (OpenAI-compatible HTTP, deterministic mock)
//! - Generation (Gemini, Anthropic, mock)
//! - Speech (HTTP transcription/synthesis, file-backed capture and playback, mocks)
//! - `api`: dependency container, CLI controllers and the HTTP server

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
