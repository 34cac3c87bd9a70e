// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parallel composition: one timer, many children moved in lock-step.
//!
//! The group owns its children and drives every one of them by seeking to
//! the group's own local time, on every movement, whether the child already
//! sits there or not. Children's own clocks never advance them; the group's
//! timer is the only source of time. The group publishes its own timer's
//! completion only, and each child keeps publishing to its own subscribers.

use crate::clock::{now_ms, ClockError, Timer, Transition};
use crate::events::EventHub;
use crate::timeline::{Listener, SubscriptionId, Timeline, TimelineEvent, TimelineId};

/// A set of timelines played simultaneously.
///
/// Length is the longest child's length; shorter children clamp at their
/// own end and simply hold there.
#[derive(Debug)]
pub struct Group<T: Timeline> {
    timer: Timer,
    children: Vec<T>,
    events: EventHub<TimelineEvent>,
}

impl<T: Timeline> Group<T> {
    /// A group running as of now.
    #[must_use]
    pub fn new(children: Vec<T>) -> Self {
        Self::with_timer(children, Timer::new(0.0))
    }

    /// A group anchored at an explicit timestamp.
    #[must_use]
    pub fn started_at(children: Vec<T>, now: f64) -> Self {
        Self::with_timer(children, Timer::started_at(0.0, now))
    }

    fn with_timer(children: Vec<T>, mut timer: Timer) -> Self {
        let length = children
            .iter()
            .fold(0.0_f64, |len, child| len.max(child.length()));
        timer.set_length(length);
        Self {
            timer,
            children,
            events: EventHub::new(),
        }
    }

    /// Add a child, growing the group if the child outlasts it.
    pub fn push(&mut self, child: T) {
        if child.length() > self.timer.length() {
            self.timer.set_length(child.length());
        }
        self.children.push(child);
    }

    /// The children, in insertion order.
    #[must_use]
    pub fn children(&self) -> &[T] {
        &self.children
    }

    /// Mutable access to the children, for subscribing to their events.
    pub fn children_mut(&mut self) -> &mut [T] {
        &mut self.children
    }

    /// Recover the children, discarding the group.
    #[must_use]
    pub fn into_children(self) -> Vec<T> {
        self.children
    }

    /// Seek with an explicit wall-clock timestamp for the re-anchor.
    pub fn seek_at(&mut self, time: f64, now: f64) {
        let tr = self.timer.apply_seek_at(time, now);
        self.drive_children();
        self.publish_sought(&tr);
    }

    fn drive_children(&mut self) {
        let time = self.timer.local_time();
        for child in &mut self.children {
            child.seek(time);
        }
    }

    fn publish_sought(&mut self, tr: &Transition) {
        self.events.publish(&TimelineEvent::Sought {
            from: tr.from,
            to: tr.to,
        });
        if tr.completed {
            self.events.publish(&TimelineEvent::Completed);
        }
    }
}

impl<T: Timeline> Timeline for Group<T> {
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
        self.drive_children();
        self.events.publish(&TimelineEvent::Updated { dt: tr.dt });
        if tr.completed {
            self.events.publish(&TimelineEvent::Completed);
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
