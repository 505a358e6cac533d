// tests/supervisor.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use stockmine::ingest::types::{Event, EventHandler, SessionRunner};
use stockmine::supervisor::{BackoffSupervisor, Clock};

/// Virtual time: `sleep` returns immediately and moves the clock forward.
#[derive(Clone)]
struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn advance(&self, d: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(d).unwrap();
    }

    fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, d: Duration) {
        self.sleeps.lock().unwrap().push(d);
        self.advance(d);
    }
}

/// Every session emits one event and then "disconnects". The session with
/// number `long_session` stays up for `long_for` before failing.
struct FlakyRunner {
    attempts: Arc<AtomicUsize>,
    clock: ManualClock,
    long_session: Option<usize>,
    long_for: Duration,
}

#[async_trait]
impl SessionRunner for FlakyRunner {
    async fn run_session(&self, handler: &dyn EventHandler) {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        handler.handle(Event::new(format!("event from session {n}"))).await;
        if Some(n) == self.long_session {
            self.clock.advance(self.long_for);
        }
    }
}

#[derive(Default)]
struct CountingHandler {
    seen: AtomicUsize,
}

#[async_trait]
impl EventHandler for CountingHandler {
    async fn handle(&self, _event: Event) {
        self.seen.fetch_add(1, Ordering::SeqCst);
    }
}

fn sum(ds: &[Duration]) -> Duration {
    ds.iter().sum()
}

#[tokio::test]
async fn gives_up_after_twelve_backoffs() {
    let clock = ManualClock::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(CountingHandler::default());
    let runner = FlakyRunner {
        attempts: attempts.clone(),
        clock: clock.clone(),
        long_session: None,
        long_for: Duration::ZERO,
    };

    BackoffSupervisor::with_clock(runner, handler.clone(), clock.clone())
        .run()
        .await;

    let sleeps = clock.sleeps();
    assert_eq!(attempts.load(Ordering::SeqCst), 13);
    assert_eq!(handler.seen.load(Ordering::SeqCst), 13);
    assert_eq!(sleeps.len(), 12);
    assert_eq!(sleeps[0], Duration::from_millis(100));
    assert_eq!(sleeps[11], Duration::from_millis(204_800));
    assert_eq!(sum(&sleeps), Duration::from_millis(409_500));
}

#[tokio::test]
async fn long_healthy_session_starts_a_fresh_sequence() {
    let clock = ManualClock::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let runner = FlakyRunner {
        attempts: attempts.clone(),
        clock: clock.clone(),
        long_session: Some(6),
        long_for: Duration::from_secs(2000),
    };

    BackoffSupervisor::with_clock(runner, Arc::new(CountingHandler::default()), clock.clone())
        .run()
        .await;

    let sleeps = clock.sleeps();
    // 5 backoffs, then the reset, then a full sequence of 12
    assert_eq!(attempts.load(Ordering::SeqCst), 18);
    assert_eq!(sleeps.len(), 17);
    assert_eq!(sleeps[4], Duration::from_millis(1_600));
    assert_eq!(sleeps[5], Duration::from_millis(100));
    assert_eq!(sum(&sleeps[..5]), Duration::from_millis(3_100));
    assert_eq!(sum(&sleeps[5..]), Duration::from_millis(409_500));
}

#[tokio::test]
async fn session_under_the_threshold_does_not_reset() {
    let clock = ManualClock::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let runner = FlakyRunner {
        attempts: attempts.clone(),
        clock: clock.clone(),
        long_session: Some(3),
        long_for: Duration::from_secs(600),
    };

    BackoffSupervisor::with_clock(runner, Arc::new(CountingHandler::default()), clock.clone())
        .run()
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 13);
    assert_eq!(sum(&clock.sleeps()), Duration::from_millis(409_500));
}
