//! Event, Source and Action contracts
//!
//! The engine only ever sees these three traits. Concrete producers and
//! consumers live outside of it; the function adapters here cover the
//! common case where a closure is enough.

use chrono::{DateTime, Utc};
use std::convert::Infallible;

/// An absolute point in time.
pub type Timestamp = DateTime<Utc>;

/// Anything that knows when it happened.
pub trait Event {
    /// The time this event occurred.
    fn timestamp(&self) -> Timestamp;
}

impl Event for Timestamp {
    fn timestamp(&self) -> Timestamp {
        *self
    }
}

impl<E: Event + ?Sized> Event for &E {
    fn timestamp(&self) -> Timestamp {
        (**self).timestamp()
    }
}

impl<E: Event + ?Sized> Event for Box<E> {
    fn timestamp(&self) -> Timestamp {
        (**self).timestamp()
    }
}

/// A pull-based producer of events (log reader, fixture, live feed...).
pub trait Source {
    type Event: Event;

    /// Next event, or `None` once the source is exhausted.
    ///
    /// Calling again after `None` must be safe; it need not resume.
    fn next_event(&mut self) -> Option<Self::Event>;
}

impl<S: Source + ?Sized> Source for &mut S {
    type Event = S::Event;

    fn next_event(&mut self) -> Option<Self::Event> {
        (**self).next_event()
    }
}

/// Work performed for each replayed event.
pub trait Action<E> {
    /// Process the event. Any time spent here counts against the schedule.
    fn process(&mut self, event: &E);
}

impl<E, A: Action<E> + ?Sized> Action<E> for &mut A {
    fn process(&mut self, event: &E) {
        (**self).process(event)
    }
}

/// An action that may fail. A failure aborts the current run and is handed
/// back to the caller untouched.
pub trait TryAction<E> {
    type Error;

    fn try_process(&mut self, event: &E) -> Result<(), Self::Error>;
}

impl<E, A: TryAction<E> + ?Sized> TryAction<E> for &mut A {
    type Error = A::Error;

    fn try_process(&mut self, event: &E) -> Result<(), A::Error> {
        (**self).try_process(event)
    }
}

/// Lifts an [`Action`] into a [`TryAction`] that never fails.
pub(crate) struct Infallibly<A>(pub(crate) A);

impl<E, A: Action<E>> TryAction<E> for Infallibly<A> {
    type Error = Infallible;

    fn try_process(&mut self, event: &E) -> Result<(), Infallible> {
        self.0.process(event);
        Ok(())
    }
}

// --- Function adapters ---

/// Source backed by a closure. Built with [`source_fn`].
pub struct FnSource<F>(F);

impl<F, E> Source for FnSource<F>
where
    F: FnMut() -> Option<E>,
    E: Event,
{
    type Event = E;

    fn next_event(&mut self) -> Option<E> {
        (self.0)()
    }
}

/// Wrap a function as a [`Source`].
pub fn source_fn<F, E>(f: F) -> FnSource<F>
where
    F: FnMut() -> Option<E>,
    E: Event,
{
    FnSource(f)
}

/// Source backed by any iterator. Built with [`iter_source`].
pub struct IterSource<I>(I);

impl<I> Source for IterSource<I>
where
    I: Iterator,
    I::Item: Event,
{
    type Event = I::Item;

    fn next_event(&mut self) -> Option<I::Item> {
        self.0.next()
    }
}

/// Replay a fixed collection (or any iterator) as a [`Source`].
pub fn iter_source<I>(events: I) -> IterSource<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Event,
{
    IterSource(events.into_iter())
}

/// Action backed by a closure. Built with [`action_fn`].
pub struct FnAction<F>(F);

impl<F, E> Action<E> for FnAction<F>
where
    F: FnMut(&E),
{
    fn process(&mut self, event: &E) {
        (self.0)(event)
    }
}

/// Wrap a function as an [`Action`].
pub fn action_fn<F, E>(f: F) -> FnAction<F>
where
    F: FnMut(&E),
{
    FnAction(f)
}

/// Fallible action backed by a closure. Built with [`try_action_fn`].
pub struct TryFnAction<F>(F);

impl<F, E, Err> TryAction<E> for TryFnAction<F>
where
    F: FnMut(&E) -> Result<(), Err>,
{
    type Error = Err;

    fn try_process(&mut self, event: &E) -> Result<(), Err> {
        (self.0)(event)
    }
}

/// Wrap a fallible function as a [`TryAction`].
pub fn try_action_fn<F, E, Err>(f: F) -> TryFnAction<F>
where
    F: FnMut(&E) -> Result<(), Err>,
{
    TryFnAction(f)
}
