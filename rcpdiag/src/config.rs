//! Retry configuration shared by connect, receive and disconnect.

use std::time::Duration;

/// Fixed attempt ceiling with a fixed pause between attempts.
///
/// The worst-case wait of any single operation is `attempts × delay` plus
/// call latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct RetryPolicy {
    /// Maximum number of attempts.
    pub attempts: u32,
    /// Pause after each failed attempt.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; `attempts` is raised to at least 1.
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            delay,
        }
    }

    /// Calls `op` until it yields `Some` or the budget runs out, sleeping
    /// [`RetryPolicy::delay`] after every failed attempt. Returns the value
    /// and the number of attempts made.
    pub fn run<T>(&self, mut op: impl FnMut(u32) -> Option<T>) -> (Option<T>, u32) {
        for attempt in 1..=self.attempts {
            if let Some(v) = op(attempt) {
                return (Some(v), attempt);
            }
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
        (None, self.attempts)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_first_success() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let (v, attempts) = policy.run(|n| (n == 3).then_some(n));
        assert_eq!(v, Some(3));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn gives_up_after_ceiling() {
        let policy = RetryPolicy::new(4, Duration::ZERO);
        let mut calls = 0;
        let (v, attempts) = policy.run(|_| {
            calls += 1;
            None::<()>
        });
        assert!(v.is_none());
        assert_eq!((calls, attempts), (4, 4));
    }

    #[test]
    fn sleeps_after_every_failed_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let start = std::time::Instant::now();
        let (v, _) = policy.run(|_| None::<()>);
        assert!(v.is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
    }
}
