use async_trait::async_trait;

use crate::domain::{AudioBuffer, DomainError, SynthesizedAudio};

/// The audio input device.
///
/// Opening acquires the device exclusively; it stays held until the returned
/// session is finished, cancelled or dropped.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Fails with [`DomainError::CaptureUnavailable`] on permission or hardware errors.
    async fn open(&self) -> Result<Box<dyn CaptureSession>, DomainError>;
}

/// One listening session holding the input device.
///
/// Implementations release the device in `Drop`, so every exit path (finish,
/// cancel, error, or the session simply going out of scope) frees it.
#[async_trait]
pub trait CaptureSession: Send {
    /// Stop recording and return everything captured as one buffer.
    async fn finish(self: Box<Self>) -> Result<AudioBuffer, DomainError>;

    /// Stop recording and discard the partial capture.
    fn cancel(self: Box<Self>);
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// An empty or whitespace-only transcript is a valid result, not an error.
    async fn transcribe(&self, audio: &AudioBuffer) -> Result<String, DomainError>;
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, DomainError>;
}

/// The audio output device.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Start playing `audio`; fails with [`DomainError::Playback`].
    async fn play(&self, audio: SynthesizedAudio) -> Result<Box<dyn PlaybackHandle>, DomainError>;
}

/// A playback in progress.
#[async_trait]
pub trait PlaybackHandle: Send {
    /// Resolve when playback ends on its own. Cancel-safe: dropping the future
    /// before completion leaves the handle usable.
    async fn finished(&mut self) -> Result<(), DomainError>;

    /// Stop immediately and release the output. Calling it again is a no-op.
    fn stop(&mut self);
}
