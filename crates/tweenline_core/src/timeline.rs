// SPDX-License-Identifier: MIT OR Apache-2.0
//! The timeline contract shared by every node in a composition tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{now_ms, ClockError};

pub use crate::events::{Listener, SubscriptionId};

/// Unique identifier for a timeline node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    /// Create a new random timeline ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle notifications common to every timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// The timeline was started (or restarted).
    Started,
    /// The timeline was stopped; its local time is frozen.
    Stopped,
    /// The timeline was sought from one local time to another.
    Sought {
        /// Local time before the seek.
        from: f64,
        /// Local time after the seek.
        to: f64,
    },
    /// The timeline advanced by a delta (signed; already clamped).
    Updated {
        /// The delta actually applied.
        dt: f64,
    },
    /// Local time crossed the timeline's length going forward.
    Completed,
}

/// Anything with a bounded duration and a seekable current position.
///
/// Invariant: `0 <= local_time() <= length()` holds after every method
/// returns. Listeners registered through [`Timeline::on`] are invoked only
/// after the node's derived state has settled, so a listener that turns
/// around and drives another timeline observes consistent state.
pub trait Timeline {
    /// This node's identifier.
    fn id(&self) -> TimelineId;

    /// Total duration. Immutable and never negative.
    fn length(&self) -> f64;

    /// Current position, always in `[0, length]`.
    fn local_time(&self) -> f64;

    /// Jump to a local time (clamped into range) and re-synchronize the
    /// underlying clock so the next update measures from the seek point.
    fn seek(&mut self, time: f64);

    /// Start (or restart) at an explicit wall-clock timestamp.
    fn start_at(&mut self, now: f64);

    /// Start (or restart) as of now.
    fn start(&mut self) {
        self.start_at(now_ms());
    }

    /// Freeze local time. Not resumable to a different position without an
    /// explicit seek.
    fn stop(&mut self);

    /// Advance to an explicit wall-clock timestamp.
    ///
    /// # Errors
    ///
    /// [`ClockError::NeverStarted`] if the timeline was never started.
    fn update_at(&mut self, now: f64) -> Result<(), ClockError>;

    /// Advance to the current wall-clock time.
    ///
    /// # Errors
    ///
    /// [`ClockError::NeverStarted`] if the timeline was never started.
    fn update(&mut self) -> Result<(), ClockError> {
        self.update_at(now_ms())
    }

    /// Subscribe to lifecycle notifications.
    fn on(&mut self, listener: Listener<TimelineEvent>) -> SubscriptionId;

    /// Remove a previously-registered listener.
    fn off(&mut self, id: SubscriptionId);
}

impl<T: Timeline + ?Sized> Timeline for Box<T> {
    fn id(&self) -> TimelineId {
        (**self).id()
    }

    fn length(&self) -> f64 {
        (**self).length()
    }

    fn local_time(&self) -> f64 {
        (**self).local_time()
    }

    fn seek(&mut self, time: f64) {
        (**self).seek(time);
    }

    fn start_at(&mut self, now: f64) {
        (**self).start_at(now);
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn update_at(&mut self, now: f64) -> Result<(), ClockError> {
        (**self).update_at(now)
    }

    fn on(&mut self, listener: Listener<TimelineEvent>) -> SubscriptionId {
        (**self).on(listener)
    }

    fn off(&mut self, id: SubscriptionId) {
        (**self).off(id);
    }
}
