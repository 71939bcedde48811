// Pacing gate between engine invocations
//
// Sequential mode serialises downloads in issue order and keeps an idle
// gap of `pause` between the end of one and the start of the next.
// Concurrent mode only caps how many run at once.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

use super::errors::DownloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPolicy {
    Sequential { pause: Duration },
    Concurrent { limit: usize },
}

#[derive(Debug)]
enum Gate {
    Sequential {
        pause: Duration,
        /// Completion time of the previous download
        last_finished: Arc<Mutex<Option<Instant>>>,
    },
    Concurrent {
        limit: usize,
        permits: Arc<Semaphore>,
    },
}

/// Shared gate; clones pace against each other
#[derive(Debug, Clone)]
pub struct Pacer {
    gate: Arc<Gate>,
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        let gate = match policy {
            PacingPolicy::Sequential { pause } => Gate::Sequential {
                pause,
                last_finished: Arc::new(Mutex::new(None)),
            },
            PacingPolicy::Concurrent { limit } => {
                let limit = limit.max(1);
                Gate::Concurrent {
                    limit,
                    permits: Arc::new(Semaphore::new(limit)),
                }
            }
        };
        Self {
            gate: Arc::new(gate),
        }
    }

    pub fn policy(&self) -> PacingPolicy {
        match &*self.gate {
            Gate::Sequential { pause, .. } => PacingPolicy::Sequential { pause: *pause },
            Gate::Concurrent { limit, .. } => PacingPolicy::Concurrent { limit: *limit },
        }
    }

    /// Wait for a turn. The returned permit must live as long as the download.
    pub async fn acquire(&self) -> Result<PacerPermit, DownloadError> {
        match &*self.gate {
            Gate::Sequential {
                pause,
                last_finished,
            } => {
                // tokio's mutex hands out the lock in FIFO order
                let guard = last_finished.clone().lock_owned().await;
                if let Some(finished) = *guard {
                    let ready_at = finished + *pause;
                    if ready_at > Instant::now() {
                        debug!(pause_secs = pause.as_secs_f64(), "pausing before next download");
                        sleep_until(ready_at).await;
                    }
                }
                Ok(PacerPermit {
                    slot: Slot::Sequential(guard),
                })
            }
            Gate::Concurrent { permits, .. } => {
                let permit = permits.clone().acquire_owned().await.map_err(|_| {
                    DownloadError::Io(std::io::Error::other("download gate closed"))
                })?;
                Ok(PacerPermit {
                    slot: Slot::Concurrent(permit),
                })
            }
        }
    }
}

#[derive(Debug)]
enum Slot {
    Sequential(OwnedMutexGuard<Option<Instant>>),
    Concurrent(#[allow(dead_code)] OwnedSemaphorePermit),
}

/// Held for the duration of one download
#[derive(Debug)]
pub struct PacerPermit {
    slot: Slot,
}

impl Drop for PacerPermit {
    fn drop(&mut self) {
        if let Slot::Sequential(last_finished) = &mut self.slot {
            **last_finished = Some(Instant::now());
        }
    }
}
