use async_trait::async_trait;

use crate::domain::{ChatMessage, DomainError};

/// An interface for sending chat-style prompts to an LLM and receiving text responses.
///
/// Implementors encapsulate transport, serialization, and vendor-specific API
/// details. Failures surface as [`DomainError::Generation`].
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a `system` instruction followed by the ordered `messages` and return
    /// the assistant's response text.
    async fn complete(&self, system: &str, messages: &[ChatMessage])
        -> Result<String, DomainError>;

    fn model_name(&self) -> &str;
}
