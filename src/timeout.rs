//! Wait budget for job polling
//!
//! - `interval`: pause between status queries
//! - `max_wait`: wall-clock budget for awaiting completion (`None` = unbounded)
//! - `failure_streak`: consecutive failed queries tolerated before giving up
//!
//! Time is read through a `Clock` so the poll loop can be driven by a
//! manual clock in tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Upper bound for `interval`
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Upper bound for `max_wait` (one week)
pub const MAX_WAIT_LIMIT: Duration = Duration::from_secs(604_800);

/// Upper bound for `failure_streak`
pub const MAX_FAILURE_STREAK: u32 = 100;

/// Polling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between status queries (default: 10 s)
    pub interval: Duration,

    /// Overall wait budget (default: 3600 s)
    pub max_wait: Option<Duration>,

    /// Consecutive query failures tolerated (default: 3)
    pub failure_streak: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Some(Duration::from_secs(3600)),
            failure_streak: 3,
        }
    }
}

impl PollPolicy {
    /// Validate policy bounds
    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        // interval must be in (0, 3600]
        if self.interval.is_zero() || self.interval > MAX_INTERVAL {
            return Err(PolicyValidationError::IntervalOutOfBounds {
                value: self.interval.as_secs_f64(),
            });
        }

        // max_wait must be in [0, 604800]
        if let Some(max_wait) = self.max_wait {
            if max_wait > MAX_WAIT_LIMIT {
                return Err(PolicyValidationError::MaxWaitOutOfBounds {
                    value: max_wait.as_secs(),
                });
            }
        }

        // failure_streak must be in [1, 100]
        if self.failure_streak == 0 || self.failure_streak > MAX_FAILURE_STREAK {
            return Err(PolicyValidationError::FailureStreakOutOfBounds {
                value: self.failure_streak,
            });
        }

        Ok(())
    }

    /// Create a policy from configured seconds; a `max_wait` of 0 means unbounded
    pub fn from_config(
        interval_seconds: Option<u64>,
        max_wait_seconds: Option<u64>,
        failure_streak: Option<u32>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            interval: interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            max_wait: match max_wait_seconds {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.max_wait,
            },
            failure_streak: failure_streak.unwrap_or(defaults.failure_streak),
        }
    }
}

/// Policy validation errors
#[derive(Debug, thiserror::Error)]
pub enum PolicyValidationError {
    #[error("interval_seconds must be in (0, 3600], got {value}")]
    IntervalOutOfBounds { value: f64 },

    #[error("max_wait_seconds must be in [0, 604800], got {value}")]
    MaxWaitOutOfBounds { value: u64 },

    #[error("failure_streak must be in [1, 100], got {value}")]
    FailureStreakOutOfBounds { value: u32 },
}

/// Source of time for the poll loop
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock; `sleep` blocks the thread
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += duration;
        }
    }

    /// Time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|o| *o).unwrap_or_default()
    }

    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }
}

/// Wait enforcer for one await
///
/// Tracks elapsed time against `max_wait`. It never sleeps itself; the
/// caller asks for the next pause and sleeps on the clock.
pub struct WaitEnforcer<'a> {
    policy: PollPolicy,
    clock: &'a dyn Clock,
    started: Instant,
}

impl<'a> WaitEnforcer<'a> {
    pub fn start(policy: PollPolicy, clock: &'a dyn Clock) -> Self {
        Self {
            policy,
            clock,
            started: clock.now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }

    /// Budget left; `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.policy
            .max_wait
            .map(|max| max.saturating_sub(self.elapsed()))
    }

    /// Pause before the next query, or `None` once the budget is spent
    pub fn next_pause(&self) -> Option<Duration> {
        match self.remaining() {
            None => Some(self.policy.interval),
            Some(r) if r.is_zero() => None,
            Some(r) => Some(self.policy.interval.min(r)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_policy_default() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, secs(10));
        assert_eq!(policy.max_wait, Some(secs(3600)));
        assert_eq!(policy.failure_streak, 3);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_validation_interval() {
        let mut policy = PollPolicy::default();
        policy.interval = Duration::ZERO;
        assert!(matches!(
            policy.validate(),
            Err(PolicyValidationError::IntervalOutOfBounds { .. })
        ));

        policy.interval = secs(3601);
        assert!(matches!(
            policy.validate(),
            Err(PolicyValidationError::IntervalOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_policy_validation_max_wait() {
        let mut policy = PollPolicy::default();
        policy.max_wait = Some(secs(604_801));
        assert!(matches!(
            policy.validate(),
            Err(PolicyValidationError::MaxWaitOutOfBounds { .. })
        ));

        policy.max_wait = None;
        assert!(policy.validate().is_ok());
        policy.max_wait = Some(Duration::ZERO);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_validation_streak() {
        let mut policy = PollPolicy::default();
        policy.failure_streak = 0;
        assert!(matches!(
            policy.validate(),
            Err(PolicyValidationError::FailureStreakOutOfBounds { .. })
        ));
        policy.failure_streak = 101;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_from_config() {
        let policy = PollPolicy::from_config(Some(5), Some(0), Some(7));
        assert_eq!(policy.interval, secs(5));
        assert_eq!(policy.max_wait, None);
        assert_eq!(policy.failure_streak, 7);

        let policy = PollPolicy::from_config(None, Some(60), None);
        assert_eq!(policy.interval, secs(10));
        assert_eq!(policy.max_wait, Some(secs(60)));
        assert_eq!(policy.failure_streak, 3);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        clock.sleep(secs(2));
        clock.advance(secs(1));
        assert_eq!(clock.now() - t0, secs(3));
        assert_eq!(clock.sleeps(), vec![secs(2)]);
    }

    #[test]
    fn test_enforcer_caps_last_pause() {
        let clock = ManualClock::new();
        let policy = PollPolicy {
            interval: secs(4),
            max_wait: Some(secs(10)),
            failure_streak: 3,
        };
        let enforcer = WaitEnforcer::start(policy, &clock);

        assert_eq!(enforcer.next_pause(), Some(secs(4)));
        clock.sleep(secs(8));
        assert_eq!(enforcer.next_pause(), Some(secs(2)));
        clock.sleep(secs(2));
        assert_eq!(enforcer.remaining(), Some(Duration::ZERO));
        assert_eq!(enforcer.next_pause(), None);
    }

    #[test]
    fn test_enforcer_unbounded() {
        let clock = ManualClock::new();
        let policy = PollPolicy {
            max_wait: None,
            ..PollPolicy::default()
        };
        let enforcer = WaitEnforcer::start(policy, &clock);
        clock.advance(secs(1_000_000));
        assert_eq!(enforcer.remaining(), None);
        assert_eq!(enforcer.next_pause(), Some(secs(10)));
    }

    #[test]
    fn test_enforcer_zero_budget() {
        let clock = ManualClock::new();
        let policy = PollPolicy {
            max_wait: Some(Duration::ZERO),
            ..PollPolicy::default()
        };
        let enforcer = WaitEnforcer::start(policy, &clock);
        assert_eq!(enforcer.remaining(), Some(Duration::ZERO));
        assert_eq!(enforcer.next_pause(), None);
    }
}
