//! Suspension between cycles.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

/// The controller's only scheduled suspension point.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn cooldown(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn cooldown(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested cooldowns without waiting. Clones share the record.
#[derive(Clone, Debug, Default)]
pub struct RecordingPacer {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn cooldown(&self, duration: Duration) {
        self.waits
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
    }
}
