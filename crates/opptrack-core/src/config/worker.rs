//! Background worker settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Controls the in-process job worker. Disabling it turns the binary into
/// a pure producer; some other instance must then drain the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of jobs processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// How long to sleep when the queue is empty.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}
