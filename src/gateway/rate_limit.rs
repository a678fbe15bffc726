//! Fixed-window rate limiting keyed by client identity.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clock::Clock;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Rejected { retry_after_secs: u64 },
}

/// Counter state for one client within the current window.
#[derive(Debug, Clone)]
struct RateWindow {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Fixed-window limiter: the window never slides.
///
/// The first call for a key, or the first call after `reset_at` has passed,
/// replaces the window wholesale with a count of one. Every call increments
/// the counter whether it is admitted or not, and calls are admitted while
/// the count stays at or below the threshold.
pub struct FixedWindowLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    window: Duration,
    max_requests: u32,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(window_seconds: u32, max_requests: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window: Duration::seconds(i64::from(window_seconds)),
            max_requests,
            clock,
        }
    }

    /// Count this call against `client_key` and decide whether it may
    /// proceed.
    pub async fn admit(&self, client_key: &str) -> Admission {
        let now = self.clock.now();
        let mut windows = self.windows.lock().await;

        let window = windows
            .entry(client_key.to_string())
            .and_modify(|w| {
                if now > w.reset_at {
                    w.count = 1;
                    w.reset_at = now + self.window;
                } else {
                    w.count += 1;
                }
            })
            .or_insert_with(|| RateWindow {
                count: 1,
                reset_at: now + self.window,
            });

        if window.count <= self.max_requests {
            Admission::Admitted {
                remaining: self.max_requests - window.count,
            }
        } else {
            let until_reset = (window.reset_at - now).num_seconds().max(0);
            Admission::Rejected {
                retry_after_secs: u64::try_from(until_reset).unwrap_or_default(),
            }
        }
    }
}
