use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::application::ChatClient;
use crate::domain::{ChatMessage, DomainError, CONTEXT_HEADER};

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

/// Offline chat client that answers from the first product named in the prompt.
pub struct MockChatClient {
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedPrompt>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            failure: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a generation error carrying `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedPrompt> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn compose_answer(system: &str, question: &str) -> String {
        let product = system
            .split_once(CONTEXT_HEADER)
            .and_then(|(_, context)| {
                context
                    .lines()
                    .find_map(|line| line.strip_prefix("Product: "))
                    .map(str::trim)
            });

        match product {
            Some(name) => format!("For \"{}\", I'd suggest the {}.", question, name),
            None => format!(
                "I don't have enough product information to answer \"{}\".",
                question
            ),
        }
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<String, DomainError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedPrompt {
                system: system.to_string(),
                messages: messages.to_vec(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = &self.failure {
            return Err(DomainError::generation(reason.clone()));
        }

        let question = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        debug!("Mock chat answering \"{}\"", question);
        Ok(Self::compose_answer(system, question))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}
