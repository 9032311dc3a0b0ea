use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Per-client fixed-window quota kept in process memory.
///
/// A window opens on a key's first consumption and lasts `window`; the first request after
/// it closes opens the next one. Counters are not shared between processes and are lost on
/// restart.
#[derive(Clone)]
pub struct RateLimiter {
    points: u32,
    window: Duration,
    state: Arc<Mutex<HashMap<String, Entry>>>,
}

#[derive(Debug)]
struct Entry {
    remaining: u32,
    resets_at: Instant,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("rate limit exceeded: window resets in ~{}s", .retry_after.as_secs())]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

impl RateLimitExceeded {
    /// Whole seconds for a `Retry-After` header, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

impl RateLimiter {
    pub fn new(points: u32, window: Duration) -> Self {
        Self {
            points,
            window,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Take one point from `key`'s current window.
    pub async fn consume(&self, key: &str) -> Result<(), RateLimitExceeded> {
        self.consume_at(key, Instant::now()).await
    }

    async fn consume_at(&self, key: &str, now: Instant) -> Result<(), RateLimitExceeded> {
        let mut state = self.state.lock().await;
        let entry = state.entry(key.to_string()).or_insert_with(|| Entry {
            remaining: self.points,
            resets_at: now + self.window,
        });

        if now >= entry.resets_at {
            entry.remaining = self.points;
            entry.resets_at = now + self.window;
        }

        if entry.remaining == 0 {
            return Err(RateLimitExceeded {
                retry_after: entry.resets_at.saturating_duration_since(now),
            });
        }
        entry.remaining -= 1;
        Ok(())
    }

    /// Drop entries whose window has closed. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let mut state = self.state.lock().await;
        let before = state.len();
        state.retain(|_, entry| entry.resets_at > now);
        before - state.len()
    }

    pub async fn tracked_keys(&self) -> usize {
        self.state.lock().await.len()
    }

    /// Run [`sweep`](Self::sweep) every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep().await;
                if removed > 0 {
                    let tracked = limiter.tracked_keys().await;
                    debug!(removed, tracked, "swept expired rate-limit entries");
                }
            }
        })
    }
}
