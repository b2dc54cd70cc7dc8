// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// How often the widget is probed and how many probes follow the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_interval: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub const fn new(retry_interval: Duration, max_retries: u32) -> Self {
        Self {
            retry_interval,
            max_retries,
        }
    }

    pub const fn from_millis(retry_interval_ms: u64, max_retries: u32) -> Self {
        Self::new(Duration::from_millis(retry_interval_ms), max_retries)
    }

    /// Total probes a cycle may run, the first one included.
    pub const fn max_probes(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Time from the first probe to exhaustion when the widget never mounts.
    pub fn worst_case_wait(&self) -> Duration {
        self.retry_interval.saturating_mul(self.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use std::time::Duration;

    #[test]
    fn default_matches_chat_buttons() {
        let policy = RetryPolicy::default();
        assert_eq!(policy, RetryPolicy::from_millis(300, 5));
        assert_eq!(policy.max_probes(), 6);
        assert_eq!(policy.worst_case_wait(), Duration::from_millis(1500));
    }

    #[test]
    fn zero_retries_means_single_probe() {
        let policy = RetryPolicy::from_millis(300, 0);
        assert_eq!(policy.max_probes(), 1);
        assert_eq!(policy.worst_case_wait(), Duration::ZERO);
    }

    #[test]
    fn probe_count_saturates() {
        let policy = RetryPolicy::from_millis(0, u32::MAX);
        assert_eq!(policy.max_probes(), u32::MAX);
        assert_eq!(policy.worst_case_wait(), Duration::ZERO);
    }
}
