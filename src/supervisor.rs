//! # Backoff supervisor
//! Keeps one logical stream alive across transient failures.
//!
//! Each return from [`SessionRunner::run_session`] counts as one failed
//! attempt. The supervisor then sleeps `step * 2^tries` and starts a new
//! session. A run of attempts forms a backoff sequence; the sequence is
//! reset when an attempt ends more than `reset_after` after the sequence
//! started, so isolated failures long after an incident start fresh.
//! After `max_tries` delays in one sequence the supervisor gives up for good.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tracing::{error, info, warn};

use crate::ingest::types::{EventHandler, SessionRunner};

/// Smallest backoff step.
pub const BACKOFF_STEP: Duration = Duration::from_millis(100);

/// 0.1 * (2^12 - 1) = 409.5 seconds of total delay in one sequence.
pub const MAX_TRIES: u32 = 12;

/// Idle time after which a new failure starts a fresh sequence.
pub const BACKOFF_RESET: Duration = Duration::from_secs(30 * 60);

/// Time source for the supervisor; swapped out in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, d: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub step: Duration,
    pub max_tries: u32,
    pub reset_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            step: BACKOFF_STEP,
            max_tries: MAX_TRIES,
            reset_after: BACKOFF_RESET,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next attempt after `tries` delays in this sequence.
    pub fn delay(&self, tries: u32) -> Duration {
        self.step * 2u32.saturating_pow(tries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub tries: u32,
    pub sequence_start: DateTime<Utc>,
}

/// What to do after an attempt ended at `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Sleep(Duration),
    GiveUp,
}

impl BackoffState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            tries: 0,
            sequence_start: now,
        }
    }

    /// Apply the sequence rules for an attempt that ended at `now` and
    /// decide the next step. On `Sleep` the try counter is advanced.
    pub fn on_attempt_end(&mut self, now: DateTime<Utc>, policy: &BackoffPolicy) -> Step {
        if self.tries == 0 {
            info!(target: "supervisor", "starting first backoff sequence");
            self.sequence_start = now;
        }

        // A clock stepping backwards counts as no idle time.
        let idle = now
            .signed_duration_since(self.sequence_start)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if idle > policy.reset_after {
            info!(target: "supervisor", idle_secs = idle.as_secs(), "starting new backoff sequence");
            self.tries = 0;
            self.sequence_start = now;
        }

        if self.tries >= policy.max_tries {
            return Step::GiveUp;
        }

        let delay = policy.delay(self.tries);
        self.tries += 1;
        Step::Sleep(delay)
    }
}

pub struct BackoffSupervisor<R, C = SystemClock> {
    runner: R,
    handler: Arc<dyn EventHandler>,
    clock: C,
    policy: BackoffPolicy,
}

impl<R: SessionRunner> BackoffSupervisor<R, SystemClock> {
    pub fn new(runner: R, handler: Arc<dyn EventHandler>) -> Self {
        Self::with_clock(runner, handler, SystemClock)
    }
}

impl<R: SessionRunner, C: Clock> BackoffSupervisor<R, C> {
    pub fn with_clock(runner: R, handler: Arc<dyn EventHandler>, clock: C) -> Self {
        Self {
            runner,
            handler,
            clock,
            policy: BackoffPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Runs sessions until the retry budget of one sequence is exhausted.
    pub async fn run(&self) {
        let mut state = BackoffState::new(self.clock.now());

        loop {
            warn!(target: "supervisor", "starting new session");
            counter!("supervisor_sessions_total").increment(1);
            self.runner.run_session(self.handler.as_ref()).await;

            match state.on_attempt_end(self.clock.now(), &self.policy) {
                Step::GiveUp => {
                    error!(
                        target: "supervisor",
                        tries = state.tries,
                        "exceeded maximum retry count, giving up"
                    );
                    return;
                }
                Step::Sleep(delay) => {
                    gauge!("backoff_tries").set(state.tries as f64);
                    warn!(target: "supervisor", secs = delay.as_secs_f64(), "waiting before reconnect");
                    self.clock.sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn delays_double_from_a_tenth_of_a_second() {
        let p = BackoffPolicy::default();
        assert_eq!(p.delay(0), Duration::from_millis(100));
        assert_eq!(p.delay(1), Duration::from_millis(200));
        assert_eq!(p.delay(11), Duration::from_millis(204_800));
    }

    #[test]
    fn gives_up_after_max_tries_within_a_sequence() {
        let p = BackoffPolicy::default();
        let mut st = BackoffState::new(t0());
        let mut total = Duration::ZERO;
        for t in 0..MAX_TRIES {
            match st.on_attempt_end(t0(), &p) {
                Step::Sleep(d) => {
                    assert_eq!(d, p.delay(t));
                    total += d;
                }
                Step::GiveUp => panic!("gave up early at {t}"),
            }
        }
        assert_eq!(st.on_attempt_end(t0(), &p), Step::GiveUp);
        assert_eq!(total, Duration::from_millis(409_500));
    }

    #[test]
    fn long_idle_resets_the_sequence() {
        let p = BackoffPolicy::default();
        let mut st = BackoffState::new(t0());
        for _ in 0..5 {
            st.on_attempt_end(t0(), &p);
        }
        assert_eq!(st.tries, 5);

        // exactly at the threshold: still the same sequence
        let at = t0() + chrono::Duration::seconds(1800);
        assert_eq!(st.on_attempt_end(at, &p), Step::Sleep(p.delay(5)));

        let later = t0() + chrono::Duration::seconds(1801);
        assert_eq!(st.on_attempt_end(later, &p), Step::Sleep(p.delay(0)));
        assert_eq!(st.tries, 1);
        assert_eq!(st.sequence_start, later);
    }
}
