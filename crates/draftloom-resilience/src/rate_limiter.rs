use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use draftloom_types::{OrchestratorError, RateLimitReason};
use tokio::sync::Mutex;

struct Window {
    started_at: Instant,
    count: u32,
}

/// Per-user fixed-window request counter. Each user gets its own lock (never a
/// single global lock) so that unrelated users never contend.
pub struct RateLimiter {
    window: Duration,
    cap: u32,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, cap: u32) -> Self {
        Self {
            window,
            cap,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Admits the request or returns `RateLimited{reason: window}`.
    pub async fn check(&self, user_id: &str) -> Result<(), OrchestratorError> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let entry = windows.entry(user_id.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.cap {
            let retry_after_ms = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_millis() as u64;
            return Err(OrchestratorError::RateLimited {
                reason: RateLimitReason::Window,
                retry_after_ms,
            });
        }

        entry.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_cap_requests_per_window() {
        let limiter = RateLimiter::new(Duration::from_millis(200), 2);
        assert!(limiter.check("u1").await.is_ok());
        assert!(limiter.check("u1").await.is_ok());
        assert!(limiter.check("u1").await.is_err());
    }

    #[tokio::test]
    async fn refuses_the_cap_plus_one_th_request_then_admits_next_window() {
        let limiter = RateLimiter::new(Duration::from_millis(50), 1);
        assert!(limiter.check("u2").await.is_ok());
        let err = limiter.check("u2").await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::RateLimited {
                reason: RateLimitReason::Window,
                ..
            }
        ));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.check("u2").await.is_ok());
    }

    #[tokio::test]
    async fn per_user_windows_are_independent() {
        let limiter = RateLimiter::new(Duration::from_millis(200), 1);
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("b").await.is_ok());
    }
}
