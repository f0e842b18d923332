//! Token-bucket rate limiter (§4.2).
//!
//! One [`RateLimiter`] guards one vendor/label pair. Capacity refills
//! continuously at `refill_per_sec` tokens/second up to `capacity`; callers
//! queue for admission in strict FIFO order via a ticket counter, and a
//! vendor `Retry-After` response can force every current and future waiter
//! to back off through [`RateLimiter::notify_retry_after`].
//!
//! Two entry points share the same ticket queue, token state, and admission
//! rule (`try_serve`): the cooperative [`RateLimiter::acquire_async`]
//! suspends the calling task on a [`tokio::sync::Notify`] composed with
//! `tokio::time::sleep`; the blocking [`RateLimiter::acquire`] parks the
//! calling thread on [`std::thread::sleep`] instead, since it has no
//! guarantee of a Tokio reactor to drive an async timer. Neither ever jumps
//! the other's place in line.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

/// Vendor/mode pair used to tag the `metrics` observability emitted by this
/// limiter. `mode` is `"sync"` or `"async"` depending on the entry point used.
#[derive(Debug, Clone)]
pub struct RateLimiterLabel {
    pub provider: String,
    pub mode: &'static str,
}

impl RateLimiterLabel {
    pub fn new(provider: impl Into<String>, mode: &'static str) -> Self {
        Self { provider: provider.into(), mode }
    }
}

/// Exceeded the caller-supplied deadline before being admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitTimeout;

impl fmt::Display for RateLimitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate limiter admission deadline exceeded")
    }
}

impl std::error::Error for RateLimitTimeout {}

struct Inner {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
    pushback_until: Option<Instant>,
    next_ticket: u64,
    now_serving: u64,
}

impl Inner {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}

/// A single token bucket shared by every caller for one vendor label.
///
/// Construct one per vendor (or per vendor+endpoint-class, per §4.2) and
/// share it via `Arc` across the adapter's fetch tasks.
pub struct RateLimiter {
    inner: Mutex<Inner>,
    notify: Notify,
    provider: String,
}

impl RateLimiter {
    /// `capacity` tokens, refilling at `refill_per_sec` tokens/second.
    pub fn new(provider: impl Into<String>, capacity: u32, refill_per_sec: f64) -> Arc<Self> {
        let capacity = capacity as f64;
        Arc::new(Self {
            inner: Mutex::new(Inner {
                capacity,
                refill_per_sec,
                tokens: capacity,
                last_refill: Instant::now(),
                pushback_until: None,
                next_ticket: 0,
                now_serving: 0,
            }),
            notify: Notify::new(),
            provider: provider.into(),
        })
    }

    /// Drain the bucket and force every current and future waiter to hold
    /// off for at least `duration`. Overlapping pushbacks extend to the max
    /// remaining wait, they never stack additively (§4.2).
    pub async fn notify_retry_after(&self, duration: Duration) {
        let now = Instant::now();
        let until = now + duration;
        {
            let mut inner = self.inner.lock().await;
            inner.tokens = 0.0;
            inner.last_refill = now;
            inner.pushback_until = Some(match inner.pushback_until {
                Some(existing) if existing > until => existing,
                _ => until,
            });
        }
        self.notify.notify_waiters();
    }

    /// Cooperative admission: suspends the calling task, never the thread.
    pub async fn acquire_async(&self, label: &RateLimiterLabel, deadline: Option<Instant>) -> Result<(), RateLimitTimeout> {
        let ticket = self.take_ticket().await;
        let mut waited = false;
        let wait_start = Instant::now();
        loop {
            let wait_for = match self.try_serve(ticket, label, waited, wait_start).await {
                ServeOutcome::Admitted => return Ok(()),
                ServeOutcome::Wait(wait_for) => {
                    waited = true;
                    wait_for
                }
            };

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(RateLimitTimeout);
                }
            }

            let notified = self.notify.notified();
            let sleep_cap = deadline
                .map(|d| d.saturating_duration_since(Instant::now()))
                .unwrap_or(wait_for)
                .min(wait_for);
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(sleep_cap) => {}
            }
        }
    }

    /// Blocking admission for non-async call sites. Parks the calling
    /// thread on [`std::thread::sleep`] rather than `tokio::time::sleep`, so
    /// it works whether or not the calling thread has a Tokio reactor —
    /// `acquire_async`'s wait relies on one, which a plain
    /// `futures_executor::block_on` never installs. Cooperates with
    /// [`Self::acquire_async`] through the same ticket queue.
    pub fn acquire(&self, label: &RateLimiterLabel, deadline: Option<Instant>) -> Result<(), RateLimitTimeout> {
        let ticket = futures_executor::block_on(self.take_ticket());
        let mut waited = false;
        let wait_start = Instant::now();
        loop {
            let wait_for = match futures_executor::block_on(self.try_serve(ticket, label, waited, wait_start)) {
                ServeOutcome::Admitted => return Ok(()),
                ServeOutcome::Wait(wait_for) => {
                    waited = true;
                    wait_for
                }
            };

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(RateLimitTimeout);
                }
            }

            let sleep_for = deadline.map(|d| d.saturating_duration_since(Instant::now())).unwrap_or(wait_for).min(wait_for);
            std::thread::sleep(sleep_for);
        }
    }

    async fn take_ticket(&self) -> u64 {
        let mut inner = self.inner.lock().await;
        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        ticket
    }

    /// Try to admit `ticket` now; otherwise report how long the caller
    /// should wait before checking again. Shared by both entry points so
    /// the serving rule (FIFO order, pushback, refill) never drifts between
    /// them.
    async fn try_serve(&self, ticket: u64, label: &RateLimiterLabel, already_waited: bool, wait_start: Instant) -> ServeOutcome {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        inner.refill(now);

        let pushback_active = inner.pushback_until.map(|until| now < until).unwrap_or(false);
        if ticket == inner.now_serving && !pushback_active && inner.tokens >= 1.0 {
            inner.tokens -= 1.0;
            inner.now_serving += 1;
            drop(inner);
            self.notify.notify_waiters();
            if already_waited {
                metrics::histogram!(
                    "marketpipe_ratelimit_wait_seconds",
                    "provider" => self.provider.clone(),
                    "mode" => label.mode,
                )
                .record(wait_start.elapsed().as_secs_f64());
            }
            return ServeOutcome::Admitted;
        }

        if !already_waited {
            metrics::counter!(
                "marketpipe_ratelimit_waits_total",
                "provider" => self.provider.clone(),
                "mode" => label.mode,
            )
            .increment(1);
        }

        // Nothing to do right now; figure out the longest we should sleep
        // before re-checking (bounded so a missed notify can't wedge us
        // forever).
        let pushback_wait = inner.pushback_until.and_then(|until| if until > now { Some(until - now) } else { None });
        let refill_wait = if inner.tokens < 1.0 && inner.refill_per_sec > 0.0 {
            Some(Duration::from_secs_f64((1.0 - inner.tokens) / inner.refill_per_sec))
        } else {
            None
        };
        let wait_for = match (pushback_wait, refill_wait) {
            (Some(a), Some(b)) => a.max(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => Duration::from_millis(50),
        };
        ServeOutcome::Wait(wait_for)
    }
}

enum ServeOutcome {
    Admitted,
    Wait(Duration),
}
