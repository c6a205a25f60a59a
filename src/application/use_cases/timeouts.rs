use std::future::Future;
use std::time::Duration;

use crate::domain::DomainError;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for each kind of external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub embedding: Duration,
    pub retrieval: Duration,
    pub generation: Duration,
    pub transcription: Duration,
    pub synthesis: Duration,
}

impl CallTimeouts {
    pub fn uniform(limit: Duration) -> Self {
        Self {
            embedding: limit,
            retrieval: limit,
            generation: limit,
            transcription: limit,
            synthesis: limit,
        }
    }
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_CALL_TIMEOUT)
    }
}

/// Run `call`, converting an elapsed deadline into the caller's error kind.
pub async fn bounded<T, F, E>(limit: Duration, call: F, on_timeout: E) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
    E: FnOnce(String) -> DomainError,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(format!(
            "timed out after {:.1}s",
            limit.as_secs_f64()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_results_within_limit() {
        let result = bounded(
            Duration::from_secs(1),
            async { Ok::<_, DomainError>(42) },
            DomainError::generation,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn elapsed_deadline_maps_to_call_kind() {
        let result: Result<(), DomainError> = bounded(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            DomainError::synthesis,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Synthesis(_))));
    }
}
