/*!
Retry configuration and the backoff/sleep port for the commit protocol
(spec §4.8, §5). Sleeping is injected rather than hardcoded to a runtime,
matching [crate::storage::ObjectStore]'s pattern: the engine has no
global singletons, so anything that touches wall-clock time is a
caller-supplied collaborator.
*/

use std::time::Duration;

use async_trait::async_trait;

/// Tunables for the commit retry loop (spec §4.8).
#[derive(Debug, Clone, Copy)]
pub struct CommitConfig {
    /// Maximum number of retries after the first attempt (spec default `R = 4`).
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Backoff is doubled each retry, capped at this value.
    pub max_backoff: Duration,
    /// Newest N metadata-log entries to keep regardless of age (spec §4.8 cleanup).
    pub retain_versions: usize,
    /// Metadata-log entries newer than this are kept regardless of count.
    pub metadata_max_age_ms: i64,
}

impl Default for CommitConfig {
    fn default() -> Self {
        CommitConfig {
            max_retries: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            retain_versions: 10,
            metadata_max_age_ms: 7 * 24 * 60 * 60 * 1000,
        }
    }
}

impl CommitConfig {
    /// The backoff duration before retry attempt `attempt` (1-indexed: the
    /// delay before the first retry is `backoff_for(1)`), doubling each
    /// time and capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let scaled = self.initial_backoff.as_millis().saturating_mul(1u128 << shift);
        let capped = scaled.min(self.max_backoff.as_millis());
        Duration::from_millis(capped as u64)
    }
}

/// The sleep collaborator the commit retry loop suspends on between
/// attempts (spec §5: "explicit sleeps in retry backoff" are awaitable
/// suspension points, not busy-waits).
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the current commit attempt for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// A [Sleeper] that does not actually wait; useful for tests that want the
/// retry loop to run at full speed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let cfg = CommitConfig {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            ..CommitConfig::default()
        };
        assert_eq!(cfg.backoff_for(1), Duration::from_millis(100));
        assert_eq!(cfg.backoff_for(2), Duration::from_millis(200));
        assert_eq!(cfg.backoff_for(3), Duration::from_millis(400));
        assert_eq!(cfg.backoff_for(4), Duration::from_millis(500));
        assert_eq!(cfg.backoff_for(10), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_noop_sleeper_returns_immediately() {
        NoopSleeper.sleep(Duration::from_secs(60)).await;
    }
}
