//! Deterministic in-process provider.
//!
//! Produces a small PNG-tagged payload derived from the prompt, fails any
//! prompt containing a configured marker, and records every call. Used by
//! the engine and HTTP tests, and handy for running the service without a
//! provider account.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ImageData, ImageProvider, ProviderError, ProviderOutput, ProviderRequest};

/// Fake provider with scripted failures and concurrency tracking.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    fail_markers: Vec<String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProvider {
    /// Provider that succeeds immediately for every prompt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every prompt containing `marker`.
    #[must_use]
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_markers.push(marker.into());
        self
    }

    /// Sleeps this long inside every call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Prompts received so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Highest number of calls observed in flight at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Bytes this provider returns for `prompt`.
    #[must_use]
    pub fn image_bytes(prompt: &str) -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(prompt.as_bytes());
        bytes
    }
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderOutput, ProviderError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.peak.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().await.push(request.prompt.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(marker) = self
            .fail_markers
            .iter()
            .find(|m| request.prompt.contains(m.as_str()))
        {
            return Err(ProviderError::Rejected(format!(
                "scripted failure on '{marker}'"
            )));
        }

        Ok(ProviderOutput {
            image: ImageData {
                bytes: Self::image_bytes(&request.prompt),
                mime_type: "image/png".to_string(),
            },
            text: vec![format!("rendered {} reference(s)", request.references.len())],
        })
    }
}
