use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::session::{ConversationEvent, ConversationSession};
use crate::domain::{ConversationState, ConversationTurn, DomainError};

/// Point-in-time view of a session, published after every transition.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub state: ConversationState,
    pub history: Vec<ConversationTurn>,
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn of(session: &ConversationSession) -> Self {
        Self {
            state: session.state(),
            history: session.history().to_vec(),
            error: session.error().map(str::to_string),
        }
    }
}

/// Runs a [`ConversationSession`] on its own task.
///
/// Every input (user controls and playback completion alike) goes through one
/// queue, so exactly one transition runs at a time. While the query path is in
/// flight the actor keeps draining the queue: `Clear` is honoured immediately and
/// the late result is discarded, everything else is ignored.
pub struct ConversationActor;

impl ConversationActor {
    pub fn spawn(session: ConversationSession) -> ConversationHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::of(&session));

        let task = tokio::spawn(run(session, events_rx, snapshot_tx));

        ConversationHandle {
            events: events_tx,
            snapshots: snapshot_rx,
            task,
        }
    }
}

async fn run(
    mut session: ConversationSession,
    mut events: mpsc::UnboundedReceiver<ConversationEvent>,
    snapshots: watch::Sender<SessionSnapshot>,
) {
    loop {
        let event = match session.playback_mut() {
            Some(playback) => {
                tokio::select! {
                    event = events.recv() => event,
                    result = playback.finished() => {
                        Some(ConversationEvent::PlaybackEnded(result.err().map(|e| e.to_string())))
                    }
                }
            }
            None => events.recv().await,
        };

        let Some(event) = event else {
            break;
        };

        let listening_stop = event == ConversationEvent::Stop
            && session.state() == ConversationState::Listening;

        if listening_stop {
            if let Some(mut pending) = session.finish_listening().await {
                let _ = snapshots.send(SessionSnapshot::of(&session));

                let result = loop {
                    tokio::select! {
                        result = &mut pending.future => break result,
                        event = events.recv() => match event {
                            Some(event) => {
                                session.handle_while_processing(event);
                                let _ = snapshots.send(SessionSnapshot::of(&session));
                            }
                            None => break (&mut pending.future).await,
                        },
                    }
                };

                session.complete_processing(pending.epoch, result).await;
            }
        } else {
            session.handle(event).await;
        }

        let _ = snapshots.send(SessionSnapshot::of(&session));
    }

    debug!("Conversation queue closed; releasing devices");
    session.shutdown();
    let _ = snapshots.send(SessionSnapshot::of(&session));
}

/// Client side of a running [`ConversationActor`].
pub struct ConversationHandle {
    events: mpsc::UnboundedSender<ConversationEvent>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl ConversationHandle {
    pub fn send(&self, event: ConversationEvent) -> Result<(), DomainError> {
        self.events
            .send(event)
            .map_err(|_| DomainError::internal("conversation session has stopped"))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Close the queue and wait for the session to release its devices.
    pub async fn shutdown(self) -> Result<(), DomainError> {
        drop(self.events);
        self.task
            .await
            .map_err(|e| DomainError::internal(format!("conversation task failed: {}", e)))
    }
}
