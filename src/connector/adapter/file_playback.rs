use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::{AudioPlayer, PlaybackHandle};
use crate::domain::{DomainError, SynthesizedAudio};

/// Roughly 128 kbit/s compressed speech.
const DEFAULT_BYTES_PER_SECOND: u64 = 16_000;
const MAX_PLAYBACK: Duration = Duration::from_secs(120);

/// Stands in for a speaker: writes each response to `out_dir` and "plays" it
/// for a time proportional to its size.
pub struct FileAudioPlayer {
    out_dir: PathBuf,
    bytes_per_second: u64,
    counter: AtomicU64,
}

impl FileAudioPlayer {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            bytes_per_second: DEFAULT_BYTES_PER_SECOND,
            counter: AtomicU64::new(0),
        }
    }

    pub fn with_bytes_per_second(mut self, bytes_per_second: u64) -> Self {
        self.bytes_per_second = bytes_per_second.max(1);
        self
    }

    fn duration_for(&self, len: usize) -> Duration {
        Duration::from_secs_f64(len as f64 / self.bytes_per_second as f64).min(MAX_PLAYBACK)
    }
}

#[async_trait]
impl AudioPlayer for FileAudioPlayer {
    async fn play(&self, audio: SynthesizedAudio) -> Result<Box<dyn PlaybackHandle>, DomainError> {
        if audio.is_empty() {
            return Err(DomainError::playback("nothing to play"));
        }

        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| DomainError::playback(format!("cannot prepare output: {}", e)))?;

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.out_dir.join(format!("response-{:03}.mp3", n));
        tokio::fs::write(&path, audio.bytes())
            .await
            .map_err(|e| DomainError::playback(format!("cannot write {}: {}", path.display(), e)))?;

        let duration = self.duration_for(audio.len());
        info!(
            "Playing {} ({} bytes, voice {}, {:.1}s)",
            path.display(),
            audio.len(),
            audio.voice(),
            duration.as_secs_f64()
        );

        Ok(Box::new(TimedPlayback::new(duration)))
    }
}

/// A playback that ends on its own after a fixed duration, or when stopped.
pub struct TimedPlayback {
    deadline: Instant,
    stopped: CancellationToken,
}

impl TimedPlayback {
    pub fn new(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
            stopped: CancellationToken::new(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }
}

#[async_trait]
impl PlaybackHandle for TimedPlayback {
    async fn finished(&mut self) -> Result<(), DomainError> {
        tokio::select! {
            _ = tokio::time::sleep_until(self.deadline) => {}
            _ = self.stopped.cancelled() => {}
        }
        Ok(())
    }

    fn stop(&mut self) {
        if !self.stopped.is_cancelled() {
            debug!("Playback stopped");
            self.stopped.cancel();
        }
    }
}
