use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::application::{AudioCapture, CaptureSession};
use crate::domain::{AudioBuffer, DomainError};

/// Exclusive claim on an input device; released when dropped.
pub(crate) struct DeviceClaim {
    in_use: Arc<AtomicBool>,
}

impl DeviceClaim {
    pub(crate) fn acquire(in_use: &Arc<AtomicBool>) -> Option<Self> {
        in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                in_use: Arc::clone(in_use),
            })
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::Release);
    }
}

pub(crate) fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("txt") => "text/plain",
        _ => "audio/webm",
    }
}

/// Treats an audio file as the microphone: every listening session "records"
/// the file's current contents.
pub struct FileAudioCapture {
    path: PathBuf,
    in_use: Arc<AtomicBool>,
}

impl FileAudioCapture {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

#[async_trait]
impl AudioCapture for FileAudioCapture {
    async fn open(&self) -> Result<Box<dyn CaptureSession>, DomainError> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| {
            DomainError::capture(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(DomainError::capture(format!(
                "{} is not a file",
                self.path.display()
            )));
        }

        let claim = DeviceClaim::acquire(&self.in_use)
            .ok_or_else(|| DomainError::capture("input device is already in use"))?;

        debug!("Capture opened on {}", self.path.display());
        Ok(Box::new(FileCaptureSession {
            path: self.path.clone(),
            _claim: claim,
        }))
    }
}

struct FileCaptureSession {
    path: PathBuf,
    _claim: DeviceClaim,
}

#[async_trait]
impl CaptureSession for FileCaptureSession {
    async fn finish(self: Box<Self>) -> Result<AudioBuffer, DomainError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            DomainError::capture(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        Ok(AudioBuffer::new(bytes, mime_type_for(&self.path)))
    }

    fn cancel(self: Box<Self>) {
        debug!("Capture on {} cancelled", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_capture_unavailable() {
        let capture = FileAudioCapture::new("/nonexistent/input.wav");
        let err = capture.open().await.err().unwrap();
        assert!(err.is_capture_unavailable());
        assert!(!capture.is_in_use());
    }

    #[tokio::test]
    async fn device_is_exclusive_until_session_ends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("question.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let capture = FileAudioCapture::new(&path);
        let session = capture.open().await.unwrap();
        assert!(capture.is_in_use());
        assert!(capture.open().await.is_err());

        let audio = session.finish().await.unwrap();
        assert_eq!(audio.bytes(), b"RIFF");
        assert_eq!(audio.mime_type(), "audio/wav");
        assert!(!capture.is_in_use());

        let session = capture.open().await.unwrap();
        session.cancel();
        assert!(!capture.is_in_use());
    }
}
