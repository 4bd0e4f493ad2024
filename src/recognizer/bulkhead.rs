//! Caps how many classifications run at once.
//!
//! A loaded model or a rate-limited endpoint can only serve a few texts at a
//! time. [`BulkheadClassifier`] hands out a fixed number of slots; with a
//! single slot every text is classified by one caller at a time.

use super::{TokenClassifier, TokenPrediction};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Longest pause between slot checks while waiting.
const MAX_BACKOFF: Duration = Duration::from_millis(25);

/// Slot limits for the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognizerBulkheadConfig {
    /// Classifications allowed in flight.
    pub max_concurrent: usize,
    /// How long a caller waits for a slot; 0 waits until one frees up.
    pub acquire_timeout_ms: u64,
    /// Reject at once instead of waiting when every slot is taken.
    pub fail_fast: bool,
}

impl Default for RecognizerBulkheadConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognizerBulkheadConfig {
    /// Four slots, ten second wait.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_concurrent: 4,
            acquire_timeout_ms: 10_000,
            fail_fast: false,
        }
    }

    /// Sets the slot count.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }
}

/// Wraps a classifier so that at most `max_concurrent` calls reach it.
pub struct BulkheadClassifier<C: TokenClassifier> {
    inner: C,
    config: RecognizerBulkheadConfig,
    slots: Arc<Semaphore>,
}

impl<C: TokenClassifier> BulkheadClassifier<C> {
    /// Wraps `inner`. A slot count of zero is raised to one.
    #[must_use]
    pub fn new(inner: C, config: RecognizerBulkheadConfig) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner,
            config,
            slots,
        }
    }

    fn rejected(&self, reason: &'static str, cause: String) -> Error {
        metrics::counter!("pii_recognizer_bulkhead_rejections_total", "reason" => reason)
            .increment(1);
        tracing::debug!(classifier = self.inner.name(), reason, "Recognizer slot refused");
        Error::Recognition { cause }
    }

    /// Takes a slot, polling with a growing pause. Callers run on plain or
    /// blocking-pool threads, so the wait cannot be awaited.
    fn take_slot(&self) -> Result<OwnedSemaphorePermit> {
        if let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() {
            return Ok(slot);
        }
        if self.config.fail_fast {
            return Err(self.rejected(
                "full",
                format!("all {} recognizer slots busy", self.config.max_concurrent.max(1)),
            ));
        }

        let deadline = (self.config.acquire_timeout_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(self.config.acquire_timeout_ms));
        let mut pause = Duration::from_millis(1);

        loop {
            std::thread::sleep(pause);
            if let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() {
                return Ok(slot);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(self.rejected(
                    "timeout",
                    format!(
                        "no recognizer slot within {}ms",
                        self.config.acquire_timeout_ms
                    ),
                ));
            }
            pause = (pause * 2).min(MAX_BACKOFF);
        }
    }
}

impl<C: TokenClassifier> TokenClassifier for BulkheadClassifier<C> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn classify(&self, text: &str) -> Result<Vec<TokenPrediction>> {
        let _slot = self.take_slot()?;
        self.inner.classify(text)
    }
}
