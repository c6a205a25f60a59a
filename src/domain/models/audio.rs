use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::domain::DomainError;

/// Audio captured during one listening session. The bytes are opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
    mime_type: String,
}

impl AudioBuffer {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Speech produced by a synthesis service, ready for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    bytes: Vec<u8>,
    voice: String,
}

impl SynthesizedAudio {
    pub fn new(bytes: Vec<u8>, voice: impl Into<String>) -> Self {
        Self {
            bytes,
            voice: voice.into(),
        }
    }

    pub fn from_base64(encoded: &str, voice: impl Into<String>) -> Result<Self, DomainError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DomainError::synthesis(format!("invalid audio payload: {}", e)))?;
        Ok(Self::new(bytes, voice))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_audio_rejects_garbage_payload() {
        let err = SynthesizedAudio::from_base64("not base64!!", "alloy").unwrap_err();
        assert!(matches!(err, DomainError::Synthesis(_)));
    }

    #[test]
    fn audio_buffer_encodes_for_transport() {
        let buffer = AudioBuffer::new(b"hi".to_vec(), "audio/webm");
        assert_eq!(buffer.to_base64(), "aGk=");

        let decoded = SynthesizedAudio::from_base64("aGk=", "alloy").unwrap();
        assert_eq!(decoded.bytes(), b"hi");
    }
}
