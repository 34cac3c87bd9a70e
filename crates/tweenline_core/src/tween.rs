// SPDX-License-Identifier: MIT OR Apache-2.0
//! A tween: a [`Timer`] bound to a compiled [`Interpolant`].
//!
//! Every movement of local time re-samples the plan into the owned value,
//! so by the time any listener runs the value already reflects the new
//! position. Progress is local time over length, clamped to `[0, 1]`; a
//! zero-length tween is always at progress `1`.

use thiserror::Error;

use tweenline_easing::Easing;

use crate::clock::{now_ms, ClockError, Timer};
use crate::events::EventHub;
use crate::interpolate::{Interpolant, InterpolateError};
use crate::timeline::{Listener, SubscriptionId, Timeline, TimelineEvent, TimelineId};
use crate::value::Value;

/// Duration and curve for a tween, applied when the builder is not given
/// explicit ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenOptions {
    /// Length in milliseconds.
    pub length: f64,
    /// Easing curve applied to progress.
    pub easing: Easing,
}

impl Default for TweenOptions {
    fn default() -> Self {
        Self {
            length: 1000.0,
            easing: Easing::default(),
        }
    }
}

/// Failures raised when finishing a [`TweenBuilder`].
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    /// No target value was staged.
    #[error("tween has no target value")]
    MissingTarget,

    /// No destination was staged.
    #[error("tween has no destination")]
    MissingDestination,

    /// The staged destination does not fit the target's shape.
    #[error(transparent)]
    Interpolate(#[from] InterpolateError),
}

/// A timeline that drives an owned [`Value`] toward a destination.
#[derive(Debug)]
pub struct Tween {
    timer: Timer,
    plan: Interpolant,
    value: Value,
    events: EventHub<TimelineEvent>,
    value_events: EventHub<Value>,
}

impl Tween {
    /// A tween running as of now.
    ///
    /// # Errors
    ///
    /// Fails when `destination` is not shape-compatible with `value`.
    pub fn new(
        value: Value,
        destination: &Value,
        options: TweenOptions,
    ) -> Result<Self, InterpolateError> {
        Self::with_timer(value, destination, options.easing, Timer::new(options.length))
    }

    /// A tween anchored at an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Fails when `destination` is not shape-compatible with `value`.
    pub fn started_at(
        value: Value,
        destination: &Value,
        options: TweenOptions,
        now: f64,
    ) -> Result<Self, InterpolateError> {
        Self::with_timer(
            value,
            destination,
            options.easing,
            Timer::started_at(options.length, now),
        )
    }

    /// A tween that must be started before it can be updated.
    ///
    /// # Errors
    ///
    /// Fails when `destination` is not shape-compatible with `value`.
    pub fn unstarted(
        value: Value,
        destination: &Value,
        options: TweenOptions,
    ) -> Result<Self, InterpolateError> {
        Self::with_timer(
            value,
            destination,
            options.easing,
            Timer::unstarted(options.length),
        )
    }

    fn with_timer(
        value: Value,
        destination: &Value,
        easing: Easing,
        timer: Timer,
    ) -> Result<Self, InterpolateError> {
        let plan = Interpolant::new(&value, destination, easing)?;
        Ok(Self {
            timer,
            plan,
            value,
            events: EventHub::new(),
            value_events: EventHub::new(),
        })
    }

    /// Start staging a tween over `value`.
    #[must_use]
    pub fn get(value: impl Into<Value>) -> TweenBuilder {
        TweenBuilder::new().target(value)
    }

    /// The tweened value at the current local time.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Recover the owned value, discarding the tween.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Local time over length, clamped to `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let length = self.timer.length();
        if length <= 0.0 {
            1.0
        } else {
            (self.timer.local_time() / length).min(1.0)
        }
    }

    /// Subscribe to the value after each movement.
    pub fn on_value(&mut self, listener: Listener<Value>) -> SubscriptionId {
        self.value_events.subscribe(listener)
    }

    /// Drop a value subscription.
    pub fn off_value(&mut self, id: SubscriptionId) {
        self.value_events.unsubscribe(id);
    }

    /// Seek with an explicit wall-clock timestamp for the re-anchor.
    pub fn seek_at(&mut self, time: f64, now: f64) {
        let tr = self.timer.apply_seek_at(time, now);
        self.refresh();
        self.events.publish(&TimelineEvent::Sought {
            from: tr.from,
            to: tr.to,
        });
        if tr.completed {
            self.events.publish(&TimelineEvent::Completed);
        }
        self.value_events.publish(&self.value);
    }

    fn refresh(&mut self) {
        self.plan.sample_into(self.progress(), &mut self.value);
    }
}

impl Timeline for Tween {
    fn id(&self) -> TimelineId {
        self.timer.id()
    }

    fn length(&self) -> f64 {
        self.timer.length()
    }

    fn local_time(&self) -> f64 {
        self.timer.local_time()
    }

    fn seek(&mut self, time: f64) {
        self.seek_at(time, now_ms());
    }

    fn start_at(&mut self, now: f64) {
        self.timer.apply_start_at(now);
        self.events.publish(&TimelineEvent::Started);
    }

    fn stop(&mut self) {
        self.timer.apply_stop();
        self.events.publish(&TimelineEvent::Stopped);
    }

    fn update_at(&mut self, now: f64) -> Result<(), ClockError> {
        let Some(tr) = self.timer.apply_update_at(now)? else {
            return Ok(());
        };
        self.refresh();
        self.events.publish(&TimelineEvent::Updated { dt: tr.dt });
        if tr.completed {
            self.events.publish(&TimelineEvent::Completed);
        }
        self.value_events.publish(&self.value);
        Ok(())
    }

    fn on(&mut self, listener: Listener<TimelineEvent>) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    fn off(&mut self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }
}

/// Staged construction of a [`Tween`].
///
/// Target and destination are required; length and easing fall back to
/// [`TweenOptions::default`] when not given.
#[derive(Debug, Default)]
pub struct TweenBuilder {
    target: Option<Value>,
    destination: Option<Value>,
    options: TweenOptions,
}

impl TweenBuilder {
    /// An empty builder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the value the tween will own and mutate.
    #[must_use]
    pub fn target(mut self, value: impl Into<Value>) -> Self {
        self.target = Some(value.into());
        self
    }

    /// Stage the destination shape.
    #[must_use]
    pub fn to(mut self, destination: impl Into<Value>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Use the given easing curve.
    #[must_use]
    pub fn with(mut self, easing: Easing) -> Self {
        self.options.easing = easing;
        self
    }

    /// Replace both length and easing at once.
    #[must_use]
    pub fn with_defaults(mut self, options: TweenOptions) -> Self {
        self.options = options;
        self
    }

    /// Run over the given length in milliseconds.
    #[must_use]
    pub fn over_time(mut self, length: f64) -> Self {
        self.options.length = length;
        self
    }

    /// Finish into a tween running as of now.
    ///
    /// # Errors
    ///
    /// Fails when target or destination is missing, or when the destination
    /// does not fit the target's shape.
    pub fn build(self) -> Result<Tween, BuildError> {
        self.build_at(now_ms())
    }

    /// Finish into a tween anchored at an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`TweenBuilder::build`].
    pub fn build_at(self, now: f64) -> Result<Tween, BuildError> {
        let target = self.target.ok_or(BuildError::MissingTarget)?;
        let destination = self.destination.ok_or(BuildError::MissingDestination)?;
        Ok(Tween::started_at(target, &destination, self.options, now)?)
    }
}
