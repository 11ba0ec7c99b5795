//! Clock - where "now" comes from and how waiting happens
//!
//! Two implementations mirror the two ways a replay runs:
//! - Realtime: `SystemClock` reads a monotonic clock pinned to a wall-clock
//!   anchor and sleeps with spin_sleep
//! - Simulated: `SimulatedClock` never blocks; sleeping just moves time forward

use crate::event::Timestamp;
use chrono::{DateTime, TimeDelta, Utc};
use spin_sleep::SpinSleeper;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of current time plus a way to wait.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Timestamp;

    /// Block for at least `duration`. Zero or negative durations return
    /// immediately.
    fn sleep(&self, duration: TimeDelta);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn sleep(&self, duration: TimeDelta) {
        (**self).sleep(duration)
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn sleep(&self, duration: TimeDelta) {
        (**self).sleep(duration)
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn sleep(&self, duration: TimeDelta) {
        (**self).sleep(duration)
    }
}

/// Realtime clock with precise blocking sleeps.
///
/// The wall time is read once at construction; after that `now()` advances
/// with `Instant`, so stepping the system clock mid-run cannot move it
/// backwards or make it jump.
#[derive(Clone, Debug)]
pub struct SystemClock {
    sleeper: SpinSleeper,
    wall_anchor: Timestamp,
    instant_anchor: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_sleeper(SpinSleeper::default(), Utc::now())
    }
}

impl SystemClock {
    /// Create a system clock using spin_sleep's default accuracy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a system clock that trusts the OS scheduler to within
    /// `native_accuracy_ns` and spins for the remainder.
    pub fn with_accuracy_ns(native_accuracy_ns: u32) -> Self {
        Self::with_sleeper(SpinSleeper::new(native_accuracy_ns), Utc::now())
    }

    /// Create a system clock that reads `wall` right now and advances
    /// monotonically from there.
    pub fn anchored_at(wall: Timestamp) -> Self {
        Self::with_sleeper(SpinSleeper::default(), wall)
    }

    fn with_sleeper(sleeper: SpinSleeper, wall: Timestamp) -> Self {
        Self {
            sleeper,
            wall_anchor: wall,
            instant_anchor: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        TimeDelta::from_std(self.instant_anchor.elapsed())
            .ok()
            .and_then(|dt| self.wall_anchor.checked_add_signed(dt))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn sleep(&self, duration: TimeDelta) {
        // to_std fails on negative deltas, which are no-ops anyway
        if let Ok(d) = duration.to_std() {
            if !d.is_zero() {
                self.sleeper.sleep(d);
            }
        }
    }
}

/// A deterministic clock for tests and dry runs.
///
/// `now()` is the base time plus everything slept so far. Sleeping returns
/// immediately after advancing the elapsed counter. Clones share the same
/// counter, so an action can burn "processing time" on the same clock the
/// engine paces against.
#[derive(Clone, Debug)]
pub struct SimulatedClock {
    base: Timestamp,
    elapsed: Rc<Cell<TimeDelta>>,
}

impl SimulatedClock {
    /// Create a clock that reads `base` until something sleeps.
    pub fn new(base: Timestamp) -> Self {
        Self {
            base,
            elapsed: Rc::new(Cell::new(TimeDelta::zero())),
        }
    }

    /// The time this clock started at.
    pub fn base(&self) -> Timestamp {
        self.base
    }

    /// Total simulated time slept across all clones.
    pub fn elapsed(&self) -> TimeDelta {
        self.elapsed.get()
    }

    /// Move time forward. Same as `sleep`.
    pub fn advance(&self, duration: TimeDelta) {
        if duration > TimeDelta::zero() {
            self.elapsed.set(self.elapsed.get() + duration);
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Timestamp {
        self.base + self.elapsed.get()
    }

    fn sleep(&self, duration: TimeDelta) {
        self.advance(duration);
    }
}

/// A clock assembled from two closures, so `now` and `sleep` can be
/// swapped out independently.
pub struct FnClock<N, S> {
    now: N,
    sleep: S,
}

impl<N, S> FnClock<N, S>
where
    N: Fn() -> Timestamp,
    S: Fn(TimeDelta),
{
    pub fn new(now: N, sleep: S) -> Self {
        Self { now, sleep }
    }
}

impl<N, S> Clock for FnClock<N, S>
where
    N: Fn() -> Timestamp,
    S: Fn(TimeDelta),
{
    fn now(&self) -> Timestamp {
        (self.now)()
    }

    fn sleep(&self, duration: TimeDelta) {
        if duration > TimeDelta::zero() {
            (self.sleep)(duration)
        }
    }
}
