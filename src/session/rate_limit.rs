use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Keeps the starts of consecutive attempts at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_start: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left before the next attempt may start.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_start {
            Some(start) => (start + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Sleep off the remainder of the interval, then mark a new attempt as
    /// started. Returns how long it slept.
    pub async fn wait(&mut self) -> Duration {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            log::debug!("Rate limiting sleeping {:.6}s", remaining.as_secs_f64());
            sleep(remaining).await;
        }
        self.last_start = Some(Instant::now());
        remaining
    }
}
