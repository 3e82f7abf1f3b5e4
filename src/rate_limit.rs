use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::metrics::{RATE_LIMIT_ENTRIES, RATE_LIMIT_SWEPT};

/// Source of "now" for the admission gate.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, used everywhere outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// Rate limit entry - tracks attempts per "bucket:client" identifier
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    fn fresh(now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            count: 0,
            reset_at: now + window,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }
}

/// Limit and window for one class of guarded operation.
///
/// Bucket names keep different operations apart in the shared table, so the
/// same client can hold independent quotas for reads and writes.
#[derive(Debug, Clone)]
pub struct RatePolicy {
    pub bucket: String,
    pub limit: u32,
    pub window: Duration,
}

impl RatePolicy {
    pub fn new(bucket: impl Into<String>, limit: u32, window: Duration) -> Self {
        let bucket = bucket.into();
        assert!(!bucket.is_empty(), "rate policy bucket must not be empty");
        assert!(limit > 0, "rate policy limit must be positive");
        assert!(!window.is_zero(), "rate policy window must be positive");
        Self {
            bucket,
            limit,
            window,
        }
    }

    // "bucket:client" - the key stored in the limiter table
    pub fn identifier(&self, client_key: &str) -> String {
        format!("{}:{}", self.bucket, client_key)
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis as u64).div_ceil(1000)
        }
    }

    pub fn reset_at_millis(&self) -> i64 {
        self.reset_at.timestamp_millis()
    }
}

/// Fixed-window admission gate shared by all request handlers.
///
/// Each identifier's read-increment-decide sequence runs while holding the
/// write guard of the shard that owns it, so concurrent checks for the same
/// identifier are serialized and never observe the same count.
pub struct RateLimiter<C: Clock = SystemClock> {
    entries: DashMap<String, RateLimitEntry>,
    // entry count kept alongside the map; DashMap::len would lock every shard
    tracked: AtomicUsize,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            tracked: AtomicUsize::new(0),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record an attempt for `identifier` and decide whether it is admitted.
    ///
    /// Rejected attempts still consume a slot in the current window.
    ///
    /// # Panics
    ///
    /// Panics on an empty identifier, a zero limit, or a window that is zero or
    /// too large to represent. Those are call-site bugs, not runtime conditions.
    pub fn check(&self, identifier: &str, limit: u32, window: Duration) -> RateLimitDecision {
        assert!(!identifier.is_empty(), "rate limit identifier must not be empty");
        assert!(limit > 0, "rate limit must be positive");
        assert!(!window.is_zero(), "rate limit window must be positive");
        let window = TimeDelta::from_std(window).expect("rate limit window out of range");

        let now = self.clock.now();
        let decision = {
            let mut entry = match self.entries.entry(identifier.to_string()) {
                Entry::Occupied(occupied) => occupied.into_ref(),
                Entry::Vacant(vacant) => {
                    self.tracked.fetch_add(1, Ordering::Relaxed);
                    vacant.insert(RateLimitEntry::fresh(now, window))
                }
            };

            // window expired..? start over
            if entry.is_expired(now) {
                *entry = RateLimitEntry::fresh(now, window);
            }

            entry.count = entry.count.saturating_add(1);

            RateLimitDecision {
                allowed: entry.count <= limit,
                limit,
                remaining: limit - entry.count.min(limit),
                reset_at: entry.reset_at,
            }
        };
        RATE_LIMIT_ENTRIES.set(self.tracked.load(Ordering::Relaxed) as f64);

        if !decision.allowed {
            tracing::debug!(identifier, limit, reset_at = %decision.reset_at, "rate limit exceeded");
        }
        decision
    }

    pub fn check_policy(&self, policy: &RatePolicy, client_key: &str) -> RateLimitDecision {
        self.check(&policy.identifier(client_key), policy.limit, policy.window)
    }

    /// Drop every entry whose window has already ended. Returns how many went.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        let after = self.tracked.fetch_sub(removed, Ordering::Relaxed) - removed;

        RATE_LIMIT_ENTRIES.set(after as f64);
        RATE_LIMIT_SWEPT.inc_by(removed as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.tracked.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }
}

/// Owned handle to the background expiry sweep.
///
/// The task lives until [`Sweeper::stop`] is awaited or the handle is dropped.
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn spawn<C>(limiter: Arc<RateLimiter<C>>, every: Duration) -> Self
    where
        C: Clock + 'static,
    {
        assert!(!every.is_zero(), "sweep interval must be positive");
        let (shutdown, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick fires immediately, nothing to sweep yet
            ticker.tick().await;

            tracing::info!(interval = ?every, "rate limit sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep_expired();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = limiter.len(), "swept expired rate limit entries");
                        }
                    }
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("rate limit sweeper stopped");
        });

        Self {
            shutdown,
            task: Some(task),
        }
    }

    /// Signal the task and wait for it to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "rate limit sweeper ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
