use std::time::Duration;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Reconnection schedule: one attempt per interval while offline.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// Consecutive failed attempts before the timer gives up; `None`
    /// retries forever (the default).
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|limit| attempts >= limit)
    }
}
