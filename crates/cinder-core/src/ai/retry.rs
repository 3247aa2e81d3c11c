//! Credential rotation
//!
//! An ordered key list with a wrapping cursor. On an auth or rate-limit
//! failure the caller advances the cursor and retries; the attempt budget
//! equals the number of keys, so every key is tried at most once per call.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::error::AgentError;

pub struct KeyRing {
    keys: Vec<String>,
    current: AtomicUsize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            current: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key the cursor currently points at.
    pub fn current(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.current.load(Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[index])
    }

    /// Advance to the next key, wrapping. The rotation sticks, so the key
    /// that worked last stays first for the next call.
    pub fn rotate(&self) {
        if self.keys.len() < 2 {
            return;
        }
        let next = (self.current.load(Ordering::Relaxed) + 1) % self.keys.len();
        self.current.store(next, Ordering::Relaxed);
        debug!("rotated to credential {next} of {}", self.keys.len());
    }

    /// Run `attempt` with the current key, rotating and retrying on
    /// credential failures until every key has been tried once.
    pub async fn with_rotation<T, F, Fut>(&self, mut attempt: F) -> Result<T, AgentError>
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = Result<T, AgentError>>,
    {
        if self.keys.is_empty() {
            return Err(AgentError::Provider("no API keys configured".to_string()));
        }

        let mut last_error = None;
        for _ in 0..self.keys.len() {
            let Some(key) = self.current().map(str::to_string) else {
                break;
            };
            match attempt(key).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_credential_failure() => {
                    warn!("credential rejected ({err}), rotating");
                    self.rotate();
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| AgentError::Provider("all keys exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn ring() -> KeyRing {
        KeyRing::new(vec!["k1".into(), "k2".into(), "k3".into()])
    }

    #[tokio::test]
    async fn test_success_on_first_key() {
        let ring = ring();
        let result = ring.with_rotation(|key| async move { Ok(key) }).await;
        assert_eq!(result.unwrap(), "k1");
    }

    #[tokio::test]
    async fn test_rotates_past_rejected_keys() {
        let ring = ring();
        let calls = AtomicUsize::new(0);

        let result = ring
            .with_rotation(|key| {
                calls.fetch_add(1, Ordering::Relaxed);
                async move {
                    if key == "k3" {
                        Ok(key)
                    } else {
                        Err(AgentError::Provider("status 401".to_string()))
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "k3");
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        // rotation sticks for the next call
        assert_eq!(ring.current(), Some("k3"));
    }

    #[tokio::test]
    async fn test_all_keys_rejected_surfaces_last_error() {
        let ring = ring();
        let result: Result<String, _> = ring
            .with_rotation(|_| async { Err(AgentError::Provider("status 429".to_string())) })
            .await;
        assert!(result.unwrap_err().is_credential_failure());
    }

    #[tokio::test]
    async fn test_non_credential_error_does_not_rotate() {
        let ring = ring();
        let calls = AtomicUsize::new(0);

        let result: Result<String, _> = ring
            .with_rotation(|_| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Err(AgentError::Provider("connection refused".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(ring.current(), Some("k1"));
    }

    #[tokio::test]
    async fn test_empty_ring_errors_immediately() {
        let ring = KeyRing::new(Vec::new());
        let result: Result<(), _> = ring.with_rotation(|_| async { Ok(()) }).await;
        assert!(result.is_err());
    }
}
