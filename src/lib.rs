//! Event Replay
//!
//! Replays a stream of timestamped events at a scaled pace relative to real
//! elapsed time:
//! - Keeps the relative spacing of the recording, compressed or stretched
//! - Charges the consumer's own processing time against the schedule
//! - Reports the final drift instead of trying to catch up
//! - Pluggable clock: realtime (spin_sleep) or simulated (instant, deterministic)

pub mod clock;
pub mod engine;
pub mod error;
pub mod event;
pub mod source;


pub use clock::{Clock, FnClock, SimulatedClock, SystemClock};
pub use engine::{Replay, ReplayConfig, Schedule};
pub use error::{ReplayError, Result};
pub use event::{
    action_fn, iter_source, source_fn, try_action_fn, Action, Event, FnAction, FnSource,
    IterSource, Source, Timestamp, TryAction, TryFnAction,
};
pub use source::{LogEvent, LogLineSource};
