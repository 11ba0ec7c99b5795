//! Engine - paced replay of a timestamped event stream
//!
//! The engine pulls events from a source, hands each to an action, then
//! sleeps just long enough to line the next pull up with the scaled schedule.
//! - Time spent inside the action counts toward the schedule
//! - Running behind never triggers a catch-up; the lag is reported as drift
//! - All timing goes through a `Clock`, so tests can use simulated time

use crate::clock::{Clock, SystemClock};
use crate::error::{ReplayError, Result};
use crate::event::{Action, Event, Infallibly, Source, Timestamp, TryAction};
use chrono::TimeDelta;
use tracing::{debug, trace};

/// Configuration for building a realtime replay.
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Speed relative to the recording. 2.0 replays twice as fast.
    pub scale: f64,
    /// Native sleep accuracy handed to spin_sleep. `None` keeps its default.
    pub sleep_accuracy_ns: Option<u32>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            sleep_accuracy_ns: None,
        }
    }
}

impl ReplayConfig {
    /// Set the replay speed.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the native sleep accuracy.
    pub fn with_sleep_accuracy_ns(mut self, ns: u32) -> Self {
        self.sleep_accuracy_ns = Some(ns);
        self
    }
}

fn valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

/// Whole nanoseconds in `d`, saturating past ~292 years.
fn nanos(d: TimeDelta) -> i64 {
    d.num_nanoseconds()
        .unwrap_or(if d < TimeDelta::zero() { i64::MIN } else { i64::MAX })
}

/// Reference points for one run: where real time and event time started.
///
/// Every offset in a run is measured against the same pair of anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Schedule {
    scale: f64,
    real_start: Timestamp,
    first_event: Timestamp,
}

impl Schedule {
    pub fn new(scale: f64, real_start: Timestamp, first_event: Timestamp) -> Self {
        Self {
            scale,
            real_start,
            first_event,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn real_start(&self) -> Timestamp {
        self.real_start
    }

    pub fn first_event(&self) -> Timestamp {
        self.first_event
    }

    /// How far ahead of the schedule we are for `event_time` when the clock
    /// reads `now`, in real time.
    ///
    /// Positive means the event is not due yet; negative means we are late.
    pub fn offset_at(&self, now: Timestamp, event_time: Timestamp) -> TimeDelta {
        let event_elapsed = nanos(event_time - self.first_event);
        let local_elapsed = (nanos(now - self.real_start) as f64 * self.scale) as i64;
        let ahead = event_elapsed.saturating_sub(local_elapsed);
        TimeDelta::nanoseconds((ahead as f64 / self.scale) as i64)
    }
}

/// Replays event sources at a scaled pace. Build one with [`Replay::new`].
#[derive(Debug)]
pub struct Replay<C = SystemClock> {
    scale: f64,
    clock: C,
}

impl Replay {
    /// Create a realtime replay running at `scale` times the recorded speed.
    ///
    /// # Panics
    ///
    /// Panics if `scale` is not a finite number greater than zero.
    pub fn new(scale: f64) -> Self {
        Self::with_clock(scale, SystemClock::new())
    }

    /// Like [`Replay::new`], but reports a bad scale instead of panicking.
    pub fn try_new(scale: f64) -> Result<Self> {
        Self::try_with_clock(scale, SystemClock::new())
    }

    /// Create a realtime replay from a config.
    pub fn from_config(config: ReplayConfig) -> Result<Self> {
        let clock = match config.sleep_accuracy_ns {
            Some(ns) => SystemClock::with_accuracy_ns(ns),
            None => SystemClock::new(),
        };
        Self::try_with_clock(config.scale, clock)
    }
}

impl<C: Clock> Replay<C> {
    /// Create a replay that reads time from (and sleeps on) `clock`.
    ///
    /// # Panics
    ///
    /// Panics if `scale` is not a finite number greater than zero.
    pub fn with_clock(scale: f64, clock: C) -> Self {
        match Self::try_with_clock(scale, clock) {
            Ok(replay) => replay,
            Err(e) => panic!("{}", e),
        }
    }

    /// Create a replay on `clock`, rejecting a bad scale.
    pub fn try_with_clock(scale: f64, clock: C) -> Result<Self> {
        if !valid_scale(scale) {
            return Err(ReplayError::InvalidScale(scale));
        }
        Ok(Self { scale, clock })
    }

    /// The configured speed.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The clock driving this replay.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Anchor a schedule at the current time with `first_event` as event zero.
    pub fn start_schedule(&self, first_event: Timestamp) -> Schedule {
        Schedule::new(self.scale, self.clock.now(), first_event)
    }

    /// Current offset from `schedule` for `event_time`. Does not sleep.
    pub fn time_offset(&self, schedule: &Schedule, event_time: Timestamp) -> TimeDelta {
        schedule.offset_at(self.clock.now(), event_time)
    }

    /// Sleep until `event_time` is due. Never tries to make up lost time.
    fn sync_time(&self, schedule: &Schedule, event_time: Timestamp) {
        let offset = self.time_offset(schedule, event_time);
        if offset > TimeDelta::zero() {
            trace!(sleep_us = offset.num_microseconds(), "pacing");
            self.clock.sleep(offset);
        } else {
            trace!(behind_us = offset.num_microseconds(), "behind schedule");
        }
    }

    /// Replay every event from `source` through `action`.
    ///
    /// Returns how far off the schedule the last event finished; negative
    /// when processing could not keep up.
    pub fn run<S, A>(&mut self, source: S, action: A) -> TimeDelta
    where
        S: Source,
        A: Action<S::Event>,
    {
        self.run_until(source, action, || false)
    }

    /// Replay until the source runs dry or `is_done` returns true.
    ///
    /// `is_done` is checked after each event is paced, before pulling the
    /// next one.
    pub fn run_until<S, A, F>(&mut self, source: S, action: A, is_done: F) -> TimeDelta
    where
        S: Source,
        A: Action<S::Event>,
        F: FnMut() -> bool,
    {
        match self.drive(source, Infallibly(action), is_done) {
            Ok(drift) => drift,
            Err(never) => match never {},
        }
    }

    /// Replay with an action that may fail. The first failure stops the run
    /// and is returned as-is.
    pub fn try_run<S, A>(
        &mut self,
        source: S,
        action: A,
    ) -> std::result::Result<TimeDelta, A::Error>
    where
        S: Source,
        A: TryAction<S::Event>,
    {
        self.drive(source, action, || false)
    }

    fn drive<S, A, F>(
        &mut self,
        mut source: S,
        mut action: A,
        mut is_done: F,
    ) -> std::result::Result<TimeDelta, A::Error>
    where
        S: Source,
        A: TryAction<S::Event>,
        F: FnMut() -> bool,
    {
        assert!(valid_scale(self.scale), "time scale must be > 0, got {}", self.scale);

        let Some(first) = source.next_event() else {
            debug!("source empty, nothing to replay");
            return Ok(TimeDelta::zero());
        };

        let schedule = self.start_schedule(first.timestamp());
        debug!(scale = self.scale, first_event = %schedule.first_event(), "replay started");

        let mut event_time = schedule.first_event();
        let mut processed: u64 = 0;
        let mut current = Some(first);

        while let Some(event) = current {
            if let Err(e) = action.try_process(&event) {
                debug!(processed, "action failed, replay aborted");
                return Err(e);
            }
            processed += 1;

            event_time = event.timestamp();
            self.sync_time(&schedule, event_time);

            current = if is_done() { None } else { source.next_event() };
        }

        let drift = self.time_offset(&schedule, event_time);
        debug!(processed, drift_us = drift.num_microseconds(), "replay finished");
        Ok(drift)
    }
}
