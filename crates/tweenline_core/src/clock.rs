// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lazy, wall-clock-synchronized time sources.
//!
//! A [`Stopwatch`] converts absolute timestamps into elapsed time without
//! drift: it only looks at the clock when asked to, and remembers the
//! timestamp of its last update. A [`Timer`] bounds a stopwatch with a fixed
//! length, clamping its local time into `[0, length]` and latching completion
//! once per forward crossing.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::events::EventHub;
use crate::timeline::{Listener, SubscriptionId, Timeline, TimelineEvent, TimelineId};

/// Clock errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    /// `update` was called on a clock that was never started.
    #[error("attempted to update a clock before it was ever started")]
    NeverStarted,
}

/// Milliseconds since the unix epoch, as `f64`.
///
/// The only external dependency of the core. Assumed non-decreasing in
/// practice, but a decreasing reading simply produces a negative delta.
#[must_use]
pub fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
        * 1000.0
}

/// A lazily-updated stopwatch anchored to wall-clock timestamps.
///
/// `elapsed` only advances when [`Stopwatch::update`] is called with a
/// timestamp; the stopwatch itself never polls the clock.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    start_time: Option<f64>,
    time_of_last_update: Option<f64>,
    elapsed: f64,
    running: bool,
}

impl Stopwatch {
    /// A stopwatch anchored and running as of now.
    #[must_use]
    pub fn new() -> Self {
        Self::started_at(now_ms())
    }

    /// A stopwatch anchored and running as of the given timestamp.
    #[must_use]
    pub fn started_at(now: f64) -> Self {
        Self {
            start_time: Some(now),
            time_of_last_update: Some(now),
            elapsed: 0.0,
            running: true,
        }
    }

    /// A stopwatch that has never been started. Updating it is an error
    /// until [`Stopwatch::start_at`] is called.
    #[must_use]
    pub fn unstarted() -> Self {
        Self {
            start_time: None,
            time_of_last_update: None,
            elapsed: 0.0,
            running: false,
        }
    }

    /// The timestamp this stopwatch was first started, if ever.
    #[must_use]
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Accumulated elapsed time, never negative.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Whether the stopwatch has ever been anchored.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.time_of_last_update.is_some()
    }

    /// Whether updates currently apply time.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Anchor at `now` and run. Restarting an already-running stopwatch
    /// simply re-anchors it.
    pub fn start_at(&mut self, now: f64) {
        self.start_time.get_or_insert(now);
        self.time_of_last_update = Some(now);
        self.running = true;
    }

    /// Freeze: subsequent updates apply no time until restarted or resynced.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Re-anchor at `now` without applying any time, and resume. Used by
    /// `seek` so the next natural update measures from the seek point.
    pub fn resync(&mut self, now: f64) {
        self.start_time.get_or_insert(now);
        self.time_of_last_update = Some(now);
        self.running = true;
    }

    /// The raw signed delta since the last update, re-anchoring at `now`.
    ///
    /// Returns `Ok(0.0)` while stopped. A `now` earlier than the anchor
    /// yields a negative delta rather than an error.
    pub fn tick(&mut self, now: f64) -> Result<f64, ClockError> {
        let anchor = self.time_of_last_update.ok_or(ClockError::NeverStarted)?;
        if !self.running {
            return Ok(0.0);
        }
        self.time_of_last_update = Some(now);
        Ok(now - anchor)
    }

    /// Advance `elapsed` by the delta since the last update, clamped so that
    /// elapsed time never goes negative. Returns the delta actually applied.
    pub fn update(&mut self, now: f64) -> Result<f64, ClockError> {
        let dt = self.tick(now)?;
        let before = self.elapsed;
        self.elapsed = (self.elapsed + dt).max(0.0);
        Ok(self.elapsed - before)
    }

    /// Jump `elapsed` to a time and re-anchor at `now`.
    pub fn seek_at(&mut self, elapsed: f64, now: f64) {
        self.elapsed = elapsed.max(0.0);
        self.resync(now);
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of one timer mutation, reported after all state has settled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Local time before the mutation.
    pub from: f64,
    /// Local time after the mutation, clamped into `[0, length]`.
    pub to: f64,
    /// The signed delta actually applied (`to - from`); may be smaller in
    /// magnitude than the wall-clock delta because of clamping.
    pub dt: f64,
    /// Whether this mutation crossed the timer's length going forward.
    pub completed: bool,
}

/// A fixed-length timeline driven by a [`Stopwatch`].
///
/// Local time is clamped into `[0, length]` at every observable point.
/// Completion fires once per monotonic forward crossing of `length`: moving
/// backward below `length` re-arms it, and it never fires while local time
/// is being driven backward.
#[derive(Debug)]
pub struct Timer {
    id: TimelineId,
    length: f64,
    local_time: f64,
    clock: Stopwatch,
    done: bool,
    events: EventHub<TimelineEvent>,
}

impl Timer {
    /// A timer anchored and running as of now.
    #[must_use]
    pub fn new(length: f64) -> Self {
        Self::with_clock(length, Stopwatch::new())
    }

    /// A timer anchored and running as of the given timestamp.
    #[must_use]
    pub fn started_at(length: f64, now: f64) -> Self {
        Self::with_clock(length, Stopwatch::started_at(now))
    }

    /// A timer that must be explicitly started before it can be updated.
    #[must_use]
    pub fn unstarted(length: f64) -> Self {
        Self::with_clock(length, Stopwatch::unstarted())
    }

    fn with_clock(length: f64, clock: Stopwatch) -> Self {
        Self {
            id: TimelineId::new(),
            length: length.max(0.0),
            local_time: 0.0,
            clock,
            done: false,
            events: EventHub::new(),
        }
    }

    /// Whether updates currently apply time.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Whether the timer has ever been anchored.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.clock.is_started()
    }

    /// Seek with an explicit wall-clock timestamp for the re-anchor.
    pub fn seek_at(&mut self, time: f64, now: f64) {
        let tr = self.apply_seek_at(time, now);
        self.publish(&tr, true);
    }

    /// Move local time, clamping and maintaining the completion latch.
    fn shift_to(&mut self, target: f64) -> Transition {
        let from = self.local_time;
        let to = target.clamp(0.0, self.length);
        self.local_time = to;
        if to < self.length {
            self.done = false;
        }
        let completed = to >= self.length && !self.done;
        if completed {
            self.done = true;
        }
        Transition {
            from,
            to,
            dt: to - from,
            completed,
        }
    }

    /// Quiet seek: mutate and re-anchor without publishing. Composite nodes
    /// embed a timer and publish their own events after their derived state
    /// has settled.
    pub(crate) fn apply_seek_at(&mut self, time: f64, now: f64) -> Transition {
        let tr = self.shift_to(time);
        self.clock.resync(now);
        tr
    }

    /// Quiet update. `Ok(None)` means the timer is stopped and nothing
    /// happened; no events should be published.
    pub(crate) fn apply_update_at(&mut self, now: f64) -> Result<Option<Transition>, ClockError> {
        if !self.clock.is_started() {
            return Err(ClockError::NeverStarted);
        }
        if !self.clock.is_running() {
            return Ok(None);
        }
        let dt = self.clock.tick(now)?;
        Ok(Some(self.shift_to(self.local_time + dt)))
    }

    /// Resize the timer. Local time is re-clamped; the completion latch is
    /// left as is, so growing a finished timer re-arms it via `shift_to`.
    pub(crate) fn set_length(&mut self, length: f64) {
        self.length = length.max(0.0);
        self.local_time = self.local_time.min(self.length);
    }

    pub(crate) fn apply_start_at(&mut self, now: f64) {
        self.clock.start_at(now);
    }

    pub(crate) fn apply_stop(&mut self) {
        self.clock.stop();
    }

    fn publish(&mut self, tr: &Transition, sought: bool) {
        if sought {
            self.events.publish(&TimelineEvent::Sought {
                from: tr.from,
                to: tr.to,
            });
        } else {
            self.events.publish(&TimelineEvent::Updated { dt: tr.dt });
        }
        if tr.completed {
            self.events.publish(&TimelineEvent::Completed);
        }
    }
}

impl Timeline for Timer {
    fn id(&self) -> TimelineId {
        self.id
    }

    fn length(&self) -> f64 {
        self.length
    }

    fn local_time(&self) -> f64 {
        self.local_time
    }

    fn seek(&mut self, time: f64) {
        self.seek_at(time, now_ms());
    }

    fn start_at(&mut self, now: f64) {
        self.apply_start_at(now);
        self.events.publish(&TimelineEvent::Started);
    }

    fn stop(&mut self) {
        self.apply_stop();
        self.events.publish(&TimelineEvent::Stopped);
    }

    fn update_at(&mut self, now: f64) -> Result<(), ClockError> {
        if let Some(tr) = self.apply_update_at(now)? {
            self.publish(&tr, false);
        }
        Ok(())
    }

    fn on(&mut self, listener: Listener<TimelineEvent>) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    fn off(&mut self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded(timer: &mut Timer) -> Rc<RefCell<Vec<TimelineEvent>>> {
        let log: Rc<RefCell<Vec<TimelineEvent>>> = Rc::default();
        let sink = Rc::clone(&log);
        timer.on(Box::new(move |ev| sink.borrow_mut().push(ev.clone())));
        log
    }

    #[test]
    fn stopwatch_measures_from_anchor() {
        let mut sw = Stopwatch::started_at(100.0);
        assert_eq!(sw.update(150.0), Ok(50.0));
        assert_eq!(sw.update(175.0), Ok(25.0));
        assert_eq!(sw.elapsed(), 75.0);
    }

    #[test]
    fn stopwatch_allows_negative_deltas_but_clamps_elapsed() {
        let mut sw = Stopwatch::started_at(100.0);
        sw.update(150.0).unwrap();
        // Wall clock ran backwards: applied delta is clamped at zero elapsed.
        assert_eq!(sw.update(20.0), Ok(-50.0));
        assert_eq!(sw.elapsed(), 0.0);
    }

    #[test]
    fn stopwatch_update_before_start_is_an_error() {
        let mut sw = Stopwatch::unstarted();
        assert_eq!(sw.update(10.0), Err(ClockError::NeverStarted));
        sw.start_at(10.0);
        assert_eq!(sw.update(15.0), Ok(5.0));
    }

    #[test]
    fn stopwatch_update_while_stopped_is_a_no_op() {
        let mut sw = Stopwatch::started_at(0.0);
        sw.update(100.0).unwrap();
        sw.stop();
        assert_eq!(sw.update(500.0), Ok(0.0));
        assert_eq!(sw.elapsed(), 100.0);
    }

    #[test]
    fn timer_clamps_local_time_to_length() {
        let mut timer = Timer::started_at(1000.0, 0.0);
        timer.update_at(400.0).unwrap();
        assert_eq!(timer.local_time(), 400.0);
        timer.update_at(5000.0).unwrap();
        assert_eq!(timer.local_time(), 1000.0);
    }

    #[test]
    fn timer_reports_applied_delta_not_raw_delta() {
        let mut timer = Timer::started_at(1000.0, 0.0);
        let log = recorded(&mut timer);
        timer.update_at(1500.0).unwrap();

        let events = log.borrow();
        assert_eq!(
            events[0],
            TimelineEvent::Updated { dt: 1000.0 },
            "clamping shrinks the reported delta"
        );
        assert_eq!(events[1], TimelineEvent::Completed);
    }

    #[test]
    fn timer_completes_once_per_forward_crossing() {
        let mut timer = Timer::started_at(1000.0, 0.0);
        let log = recorded(&mut timer);

        timer.seek_at(1000.0, 0.0);
        timer.seek_at(1000.0, 0.0);
        let completions = |log: &Rc<RefCell<Vec<TimelineEvent>>>| {
            log.borrow()
                .iter()
                .filter(|ev| matches!(ev, TimelineEvent::Completed))
                .count()
        };
        assert_eq!(completions(&log), 1, "re-seeking the end must not re-fire");

        timer.seek_at(400.0, 0.0);
        timer.seek_at(1000.0, 0.0);
        assert_eq!(completions(&log), 2, "a new forward crossing re-fires");
    }

    #[test]
    fn timer_never_completes_moving_backward() {
        let mut timer = Timer::started_at(1000.0, 0.0);
        timer.seek_at(1000.0, 0.0);
        let log = recorded(&mut timer);
        timer.seek_at(200.0, 0.0);
        timer.update_at(1.0).unwrap();
        assert!(log
            .borrow()
            .iter()
            .all(|ev| !matches!(ev, TimelineEvent::Completed)));
    }

    #[test]
    fn timer_seek_resynchronizes_the_anchor() {
        let mut timer = Timer::started_at(1000.0, 0.0);
        timer.update_at(100.0).unwrap();
        // Seek at wall time 500; the next update measures from 500, not 100.
        timer.seek_at(300.0, 500.0);
        timer.update_at(600.0).unwrap();
        assert_eq!(timer.local_time(), 400.0);
    }

    #[test]
    fn timer_seek_round_trip_is_idempotent() {
        let mut timer = Timer::started_at(1000.0, 0.0);
        timer.seek_at(700.0, 0.0);
        let once = timer.local_time();

        timer.seek_at(0.0, 0.0);
        timer.seek_at(700.0, 0.0);
        assert_eq!(timer.local_time(), once);
    }

    #[test]
    fn timer_update_before_start_fails() {
        let mut timer = Timer::unstarted(1000.0);
        assert_eq!(timer.update_at(10.0), Err(ClockError::NeverStarted));
        timer.start_at(10.0);
        timer.update_at(20.0).unwrap();
        assert_eq!(timer.local_time(), 10.0);
    }

    #[test]
    fn timer_update_while_stopped_emits_nothing() {
        let mut timer = Timer::started_at(1000.0, 0.0);
        timer.update_at(100.0).unwrap();
        timer.apply_stop();
        let log = recorded(&mut timer);
        timer.update_at(900.0).unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(timer.local_time(), 100.0);
    }

    #[test]
    fn zero_length_timer_completes_exactly_once() {
        let mut timer = Timer::started_at(0.0, 0.0);
        let log = recorded(&mut timer);
        timer.seek_at(0.0, 0.0);
        timer.update_at(10.0).unwrap();
        let completions = log
            .borrow()
            .iter()
            .filter(|ev| matches!(ev, TimelineEvent::Completed))
            .count();
        assert_eq!(completions, 1);
    }
}
