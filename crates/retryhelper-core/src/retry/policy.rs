use crate::config::RetryConfig;

/// Exponential backoff with a hard ceiling.
///
/// The first retry waits `initial_wait_ms` verbatim; every following wait is
/// the previous one doubled, capped at `max_wait_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial_wait_ms: u64,
    max_wait_ms: u64,
}

impl BackoffPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            initial_wait_ms: config.initial_wait_ms(),
            max_wait_ms: config.max_wait_ms(),
        }
    }

    /// Wait before the first retry.
    pub fn first_wait_ms(&self) -> u64 {
        self.clamp(self.initial_wait_ms)
    }

    /// Wait following `current_ms`: doubled, never above the ceiling (also on overflow).
    pub fn next_wait_ms(&self, current_ms: u64) -> u64 {
        current_ms
            .checked_mul(2)
            .map_or(self.max_wait_ms, |next| self.clamp(next))
    }

    pub fn clamp(&self, wait_ms: u64) -> u64 {
        wait_ms.min(self.max_wait_ms)
    }

    /// The waits a caller observes when every one of `retries` retries is used.
    pub fn schedule(&self, retries: u32) -> Vec<u64> {
        let mut waits = Vec::with_capacity(retries as usize);
        let mut wait = self.first_wait_ms();
        for _ in 0..retries {
            waits.push(wait);
            wait = self.next_wait_ms(wait);
        }
        waits
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial: u64, max: u64) -> BackoffPolicy {
        BackoffPolicy::new(&RetryConfig::new(10, initial, max).unwrap())
    }

    #[test]
    fn first_wait_is_initial_verbatim() {
        assert_eq!(policy(500, 2000).first_wait_ms(), 500);
    }

    #[test]
    fn doubles_and_caps() {
        let p = policy(500, 2000);
        assert_eq!(p.next_wait_ms(500), 1000);
        assert_eq!(p.next_wait_ms(1000), 2000);
        assert_eq!(p.next_wait_ms(2000), 2000);
        assert_eq!(p.next_wait_ms(1500), 2000);
    }

    #[test]
    fn overflow_clamps_to_max() {
        let p = policy(1, u64::MAX);
        assert_eq!(p.next_wait_ms(u64::MAX / 2 + 1), u64::MAX);
    }

    #[test]
    fn schedule_matches_closed_form() {
        let p = policy(100, 5_000);
        let waits = p.schedule(8);
        for (i, w) in waits.iter().enumerate() {
            let expected = (100u64 << i).min(5_000);
            assert_eq!(*w, expected, "wait before attempt {}", i + 2);
        }
        assert_eq!(policy(500, 2000).schedule(3), vec![500, 1000, 2000]);
    }

    #[test]
    fn schedule_never_exceeds_ceiling() {
        let p = policy(7, 300);
        assert!(p.schedule(64).iter().all(|w| *w <= 300));
    }
}
