use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::file_capture::DeviceClaim;
use crate::application::{
    AudioCapture, AudioPlayer, CaptureSession, PlaybackHandle, Synthesizer, Transcriber,
};
use crate::domain::{AudioBuffer, DomainError, SynthesizedAudio};

/// Input device returning canned audio.
pub struct MockCapture {
    audio: Vec<u8>,
    failure: Option<String>,
    in_use: Arc<AtomicBool>,
    opened: AtomicUsize,
}

impl MockCapture {
    pub fn new(audio: impl Into<Vec<u8>>) -> Self {
        Self {
            audio: audio.into(),
            failure: None,
            in_use: Arc::new(AtomicBool::new(false)),
            opened: AtomicUsize::new(0),
        }
    }

    /// A device that refuses to open, as when permission is denied.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(Vec::new())
        }
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn times_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AudioCapture for MockCapture {
    async fn open(&self) -> Result<Box<dyn CaptureSession>, DomainError> {
        if let Some(reason) = &self.failure {
            return Err(DomainError::capture(reason.clone()));
        }

        let claim = DeviceClaim::acquire(&self.in_use)
            .ok_or_else(|| DomainError::capture("input device is already in use"))?;
        self.opened.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(MockCaptureSession {
            audio: self.audio.clone(),
            _claim: claim,
        }))
    }
}

struct MockCaptureSession {
    audio: Vec<u8>,
    _claim: DeviceClaim,
}

#[async_trait]
impl CaptureSession for MockCaptureSession {
    async fn finish(self: Box<Self>) -> Result<AudioBuffer, DomainError> {
        Ok(AudioBuffer::new(self.audio.clone(), "text/plain"))
    }

    fn cancel(self: Box<Self>) {}
}

enum TranscriptSource {
    /// The audio bytes read as UTF-8 text.
    Echo,
    Fixed(String),
    Fail(String),
}

/// Transcriber with a scripted result.
pub struct MockTranscriber {
    source: TranscriptSource,
    delay: Option<Duration>,
}

impl MockTranscriber {
    pub fn echo() -> Self {
        Self {
            source: TranscriptSource::Echo,
            delay: None,
        }
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            source: TranscriptSource::Fixed(text.into()),
            delay: None,
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            source: TranscriptSource::Fail(reason.into()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: &AudioBuffer) -> Result<String, DomainError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.source {
            TranscriptSource::Echo => Ok(String::from_utf8_lossy(audio.bytes()).into_owned()),
            TranscriptSource::Fixed(text) => Ok(text.clone()),
            TranscriptSource::Fail(reason) => Err(DomainError::transcription(reason.clone())),
        }
    }
}

/// Synthesizer whose "audio" is the UTF-8 bytes of the text.
pub struct MockSynthesizer {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, DomainError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.failure {
            Some(reason) => Err(DomainError::synthesis(reason.clone())),
            None => Ok(SynthesizedAudio::new(text.as_bytes().to_vec(), "mock")),
        }
    }
}

#[derive(Clone)]
enum PlaybackScript {
    /// Ends on its own after the duration.
    For(Duration),
    /// Runs until stopped.
    UntilStopped,
    /// Fails to start.
    RefuseStart(String),
    /// Starts, then breaks after the duration.
    BreakAfter(Duration, String),
}

/// Output device with scripted playback behaviour.
pub struct MockPlayer {
    script: PlaybackScript,
    active: Arc<AtomicUsize>,
    played: Arc<std::sync::Mutex<Vec<SynthesizedAudio>>>,
}

impl MockPlayer {
    fn with_script(script: PlaybackScript) -> Self {
        Self {
            script,
            active: Arc::new(AtomicUsize::new(0)),
            played: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn finishing_after(duration: Duration) -> Self {
        Self::with_script(PlaybackScript::For(duration))
    }

    pub fn until_stopped() -> Self {
        Self::with_script(PlaybackScript::UntilStopped)
    }

    pub fn refusing(reason: impl Into<String>) -> Self {
        Self::with_script(PlaybackScript::RefuseStart(reason.into()))
    }

    pub fn breaking_after(duration: Duration, reason: impl Into<String>) -> Self {
        Self::with_script(PlaybackScript::BreakAfter(duration, reason.into()))
    }

    /// Playbacks started and not yet stopped or finished.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn played(&self) -> Vec<SynthesizedAudio> {
        self.played
            .lock()
            .map(|played| played.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AudioPlayer for MockPlayer {
    async fn play(&self, audio: SynthesizedAudio) -> Result<Box<dyn PlaybackHandle>, DomainError> {
        if let PlaybackScript::RefuseStart(reason) = &self.script {
            return Err(DomainError::playback(reason.clone()));
        }

        if let Ok(mut played) = self.played.lock() {
            played.push(audio);
        }
        self.active.fetch_add(1, Ordering::AcqRel);

        Ok(Box::new(MockPlayback {
            script: self.script.clone(),
            started: tokio::time::Instant::now(),
            stopped: CancellationToken::new(),
            active: Some(Arc::clone(&self.active)),
        }))
    }
}

struct MockPlayback {
    script: PlaybackScript,
    started: tokio::time::Instant,
    stopped: CancellationToken,
    active: Option<Arc<AtomicUsize>>,
}

impl MockPlayback {
    fn release(&mut self) {
        if let Some(active) = self.active.take() {
            active.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for MockPlayback {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl PlaybackHandle for MockPlayback {
    async fn finished(&mut self) -> Result<(), DomainError> {
        let (after, failure) = match &self.script {
            PlaybackScript::For(duration) => (Some(*duration), None),
            PlaybackScript::BreakAfter(duration, reason) => (Some(*duration), Some(reason.clone())),
            PlaybackScript::UntilStopped | PlaybackScript::RefuseStart(_) => (None, None),
        };

        let ended = async {
            match after {
                Some(duration) => tokio::time::sleep_until(self.started + duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = ended => {
                self.release();
                match failure {
                    Some(reason) => Err(DomainError::playback(reason)),
                    None => Ok(()),
                }
            }
            _ = self.stopped.cancelled() => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.stopped.cancel();
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capture_releases_device_on_every_exit() {
        let capture = MockCapture::new("hello");

        let session = capture.open().await.unwrap();
        assert!(capture.is_in_use());
        let audio = session.finish().await.unwrap();
        assert_eq!(audio.bytes(), b"hello");
        assert!(!capture.is_in_use());

        let session = capture.open().await.unwrap();
        drop(session);
        assert!(!capture.is_in_use());
        assert_eq!(capture.times_opened(), 2);
    }

    #[tokio::test]
    async fn echo_transcriber_reads_audio_as_text() {
        let text = MockTranscriber::echo()
            .transcribe(&AudioBuffer::new(b"Do you have drones?".to_vec(), "text/plain"))
            .await
            .unwrap();
        assert_eq!(text, "Do you have drones?");
    }

    #[tokio::test]
    async fn stopped_playback_is_released() {
        let player = MockPlayer::until_stopped();
        let mut handle = player
            .play(SynthesizedAudio::new(b"hi".to_vec(), "mock"))
            .await
            .unwrap();
        assert_eq!(player.active(), 1);

        handle.stop();
        handle.stop();
        assert_eq!(player.active(), 0);
        handle.finished().await.unwrap();
    }

    #[tokio::test]
    async fn breaking_playback_reports_error() {
        let player = MockPlayer::breaking_after(Duration::from_millis(5), "speaker unplugged");
        let mut handle = player
            .play(SynthesizedAudio::new(b"hi".to_vec(), "mock"))
            .await
            .unwrap();

        let err = handle.finished().await.unwrap_err();
        assert!(matches!(err, DomainError::Playback(_)));
        assert_eq!(player.active(), 0);
    }
}
