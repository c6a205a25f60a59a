use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::application::use_cases::retrieve_context::{GroundingContext, RetrieveContextUseCase};
use crate::application::use_cases::timeouts::{bounded, CallTimeouts};
use crate::application::ChatClient;
use crate::domain::{compose_system_prompt, ChatMessage, DomainError, Role};

/// A generated reply and what it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub context_documents: usize,
    pub grounded: bool,
}

/// Retrieve grounding context for a question and ask the language model.
pub struct AnswerQuestionUseCase {
    retriever: Arc<RetrieveContextUseCase>,
    chat_client: Arc<dyn ChatClient>,
    timeouts: CallTimeouts,
}

impl AnswerQuestionUseCase {
    pub fn new(retriever: Arc<RetrieveContextUseCase>, chat_client: Arc<dyn ChatClient>) -> Self {
        Self {
            retriever,
            chat_client,
            timeouts: CallTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// `history` is every completed turn so far, not including `question`.
    pub async fn answer(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<Answer, DomainError> {
        self.answer_with_fallback(question, history, None).await
    }

    /// Like [`Self::answer`], using `fallback_context` when retrieval finds nothing.
    pub async fn answer_with_fallback(
        &self,
        question: &str,
        history: &[ChatMessage],
        fallback_context: Option<String>,
    ) -> Result<Answer, DomainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::invalid_input("question is empty"));
        }

        let start_time = Instant::now();

        let mut context = self.retriever.retrieve(question).await?;
        if context.is_empty() {
            if let Some(fallback) = fallback_context.filter(|f| !f.trim().is_empty()) {
                debug!("Retrieval found nothing, using caller-supplied product context");
                context = GroundingContext {
                    text: fallback,
                    documents: 0,
                    degraded: context.degraded,
                };
            }
        }

        let system = compose_system_prompt(&context.text);

        let mut messages: Vec<ChatMessage> = history.to_vec();
        messages.push(ChatMessage::new(Role::User, question));

        let text = bounded(
            self.timeouts.generation,
            self.chat_client.complete(&system, &messages),
            DomainError::generation,
        )
        .await?;

        info!(
            "Generated answer with {} in {:.2}s ({} context documents, {} history turns)",
            self.chat_client.model_name(),
            start_time.elapsed().as_secs_f64(),
            context.documents,
            history.len()
        );

        Ok(Answer {
            text: text.trim().to_string(),
            context_documents: context.documents,
            grounded: !context.is_empty(),
        })
    }
}
