use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::use_cases::answer_question::AnswerQuestionUseCase;
use crate::application::use_cases::timeouts::{bounded, CallTimeouts};
use crate::application::{
    AudioCapture, AudioPlayer, CaptureSession, PlaybackHandle, Synthesizer, Transcriber,
};
use crate::domain::{
    AudioBuffer, ChatMessage, ConversationState, ConversationTurn, DomainError, MSG_NO_SPEECH,
    MSG_PLAYBACK_FAILED,
};

/// Inputs to the conversation state machine. Device callbacks (capture ended,
/// playback ended or failed) arrive here as messages too.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// Open the microphone. Accepted only from `Idle`.
    Start,
    /// Finish listening and answer, or stop speaking.
    Stop,
    /// Abandon listening without answering, or stop speaking.
    Cancel,
    /// Playback ended on its own; carries the failure message if it broke.
    PlaybackEnded(Option<String>),
    /// Forget the conversation history and any pending error.
    Clear,
}

/// Everything the session talks to, injected at construction.
pub struct ConversationServices {
    pub capture: Arc<dyn AudioCapture>,
    pub transcriber: Arc<dyn Transcriber>,
    pub answerer: Arc<AnswerQuestionUseCase>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub player: Arc<dyn AudioPlayer>,
    pub timeouts: CallTimeouts,
}

/// Result of the query path for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    NoSpeech,
    Answered { question: String, answer: String },
}

pub type ProcessingFuture =
    Pin<Box<dyn Future<Output = Result<TurnOutcome, DomainError>> + Send + 'static>>;

/// An in-flight query path, tagged with the history epoch it was started in.
pub struct PendingTurn {
    pub epoch: u64,
    pub future: ProcessingFuture,
}

/// Turn-based voice conversation: `Idle → Listening → Processing → Speaking → Idle`.
///
/// The session is the only owner of the capture session, the playback handle and
/// the history. All mutation goes through `&mut self`, so transitions are
/// serialized by construction; [`super::ConversationActor`] feeds it from a queue.
pub struct ConversationSession {
    services: Arc<ConversationServices>,
    state: ConversationState,
    capture: Option<Box<dyn CaptureSession>>,
    playback: Option<Box<dyn PlaybackHandle>>,
    history: Vec<ConversationTurn>,
    error: Option<String>,
    /// Bumped on every clear so results from before the clear are discarded.
    epoch: u64,
}

impl ConversationSession {
    pub fn new(services: Arc<ConversationServices>) -> Self {
        Self {
            services,
            state: ConversationState::Idle,
            capture: None,
            playback: None,
            history: Vec::new(),
            error: None,
            epoch: 0,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub(crate) fn playback_mut(&mut self) -> Option<&mut Box<dyn PlaybackHandle>> {
        self.playback.as_mut()
    }

    /// Apply one event and run any work it triggers to completion.
    pub async fn handle(&mut self, event: ConversationEvent) -> ConversationState {
        match event {
            ConversationEvent::Start => self.start_listening().await,
            ConversationEvent::Stop => match self.state {
                ConversationState::Listening => {
                    if let Some(pending) = self.finish_listening().await {
                        let result = pending.future.await;
                        self.complete_processing(pending.epoch, result).await;
                    }
                }
                ConversationState::Speaking => self.stop_speaking(),
                _ => self.ignore(&event),
            },
            ConversationEvent::Cancel => match self.state {
                ConversationState::Listening => self.cancel_listening(),
                ConversationState::Speaking => self.stop_speaking(),
                _ => self.ignore(&event),
            },
            ConversationEvent::PlaybackEnded(failure) => self.playback_ended(failure),
            ConversationEvent::Clear => self.clear(),
        }
        self.state
    }

    /// Block until the current playback finishes on its own, then apply it.
    pub async fn wait_for_playback(&mut self) -> ConversationState {
        let failure = match self.playback.as_mut() {
            Some(playback) => playback.finished().await.err().map(|e| e.to_string()),
            None => return self.state,
        };
        self.playback_ended(failure);
        self.state
    }

    pub async fn start_listening(&mut self) {
        if self.state != ConversationState::Idle {
            self.ignore(&ConversationEvent::Start);
            return;
        }

        self.error = None;

        match self.services.capture.open().await {
            Ok(session) => {
                self.capture = Some(session);
                self.transition(ConversationState::Listening);
            }
            Err(e) => {
                warn!("Could not open capture device: {}", e);
                self.fail(e);
            }
        }
    }

    pub fn cancel_listening(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.cancel();
        }
        self.transition(ConversationState::Idle);
    }

    /// Close the capture and hand back the query path to run.
    ///
    /// The device is released before this returns whatever the outcome. `None`
    /// means finalizing the capture failed and the session is back in `Idle`.
    pub async fn finish_listening(&mut self) -> Option<PendingTurn> {
        if self.state != ConversationState::Listening {
            self.ignore(&ConversationEvent::Stop);
            return None;
        }

        let audio = match self.capture.take() {
            Some(capture) => capture.finish().await,
            None => Err(DomainError::capture("no active capture session")),
        };

        let audio = match audio {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Capture could not be finalized: {}", e);
                self.fail(e);
                return None;
            }
        };

        debug!("Captured {} bytes of {}", audio.len(), audio.mime_type());
        self.transition(ConversationState::Processing);

        let history: Vec<ChatMessage> = self.history.iter().map(ConversationTurn::to_message).collect();
        let services = Arc::clone(&self.services);

        Some(PendingTurn {
            epoch: self.epoch,
            future: Box::pin(run_query_path(services, audio, history)),
        })
    }

    /// Record the outcome of a query path and, on success, start speaking.
    pub async fn complete_processing(&mut self, epoch: u64, result: Result<TurnOutcome, DomainError>) {
        if self.state != ConversationState::Processing {
            debug!("Dropping query result outside of processing ({})", self.state);
            return;
        }

        if epoch != self.epoch {
            info!("Conversation was cleared while processing; discarding result");
            self.transition(ConversationState::Idle);
            return;
        }

        match result {
            Err(e) => {
                error!("Turn failed: {}", e);
                self.fail(e);
            }
            Ok(TurnOutcome::NoSpeech) => {
                info!("Transcript was empty");
                self.error = Some(MSG_NO_SPEECH.to_string());
                self.transition(ConversationState::Idle);
            }
            Ok(TurnOutcome::Answered { question, answer }) => {
                self.history.push(ConversationTurn::user(question));
                self.history.push(ConversationTurn::assistant(answer.clone()));
                self.speak(&answer).await;
            }
        }
    }

    /// Only `Clear` has an effect while the query path is in flight.
    pub fn handle_while_processing(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::Clear => self.clear(),
            other => self.ignore(&other),
        }
    }

    async fn speak(&mut self, text: &str) {
        self.transition(ConversationState::Speaking);

        let audio = match bounded(
            self.services.timeouts.synthesis,
            self.services.synthesizer.synthesize(text),
            DomainError::synthesis,
        )
        .await
        {
            Ok(audio) => audio,
            Err(e) => {
                error!("Synthesis failed: {}", e);
                self.fail(e);
                return;
            }
        };

        match self.services.player.play(audio).await {
            Ok(handle) => self.playback = Some(handle),
            Err(e) => {
                error!("Playback failed to start: {}", e);
                self.fail(e);
            }
        }
    }

    pub fn stop_speaking(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
        if self.state == ConversationState::Speaking {
            self.transition(ConversationState::Idle);
        }
    }

    fn playback_ended(&mut self, failure: Option<String>) {
        if self.state != ConversationState::Speaking {
            debug!("Ignoring playback end outside of speaking");
            return;
        }

        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }

        if let Some(reason) = failure {
            warn!("Playback failed: {}", reason);
            self.error = Some(MSG_PLAYBACK_FAILED.to_string());
        }

        self.transition(ConversationState::Idle);
    }

    /// Reset history and pending error. The document index is untouched.
    pub fn clear(&mut self) {
        info!("Clearing conversation ({} turns)", self.history.len());
        self.history.clear();
        self.error = None;
        self.epoch += 1;
    }

    /// Release every device; used when the session is torn down.
    pub fn shutdown(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.cancel();
        }
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
        self.state = ConversationState::Idle;
    }

    fn fail(&mut self, e: DomainError) {
        if let Some(capture) = self.capture.take() {
            capture.cancel();
        }
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
        self.error = Some(e.user_message().to_string());
        self.transition(ConversationState::Idle);
    }

    fn transition(&mut self, next: ConversationState) {
        if self.state != next {
            info!("Conversation state: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn ignore(&self, event: &ConversationEvent) {
        debug!("Ignoring {:?} while {}", event, self.state);
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Transcribe, then retrieve and generate. Owns everything it touches so it can run
/// while the session keeps handling events.
async fn run_query_path(
    services: Arc<ConversationServices>,
    audio: AudioBuffer,
    history: Vec<ChatMessage>,
) -> Result<TurnOutcome, DomainError> {
    let transcript = bounded(
        services.timeouts.transcription,
        services.transcriber.transcribe(&audio),
        DomainError::transcription,
    )
    .await?;

    let question = transcript.trim();
    if question.is_empty() {
        return Ok(TurnOutcome::NoSpeech);
    }

    info!("Heard: \"{}\"", question);

    let answer = services.answerer.answer(question, &history).await?;

    Ok(TurnOutcome::Answered {
        question: question.to_string(),
        answer: answer.text,
    })
}
