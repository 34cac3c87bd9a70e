// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timelines, tweens, and their composition for Tweenline.
//!
//! This crate provides the animation model:
//! - Lazy wall-clock timing (stopwatch and fixed-length timer)
//! - Structural interpolation over dynamic value trees
//! - Tweens binding a timer to an interpolation plan
//! - Parallel composition via groups
//! - Ordered composition via sequences with active-set tracking
//!
//! ## Architecture
//!
//! Everything is built on:
//! - A [`Timeline`] trait shared by timers, tweens, groups, and sequences
//! - Clocks that measure elapsed time only when asked, never on their own
//! - Composites that own their children and drive them purely by seeking
//! - Event hubs publishing only after derived state has settled

pub mod clock;
pub mod events;
pub mod group;
pub mod interpolate;
pub mod sequence;
pub mod timeline;
pub mod tween;
pub mod value;

pub use clock::{now_ms, ClockError, Stopwatch, Timer, Transition};
pub use events::EventHub;
pub use group::Group;
pub use interpolate::{Interpolant, InterpolateError};
pub use sequence::{Sequence, SequenceBuilder, SequenceEvent, Sequenced};
pub use timeline::{Listener, SubscriptionId, Timeline, TimelineEvent, TimelineId};
pub use tween::{BuildError, Tween, TweenBuilder, TweenOptions};
pub use value::{Path, Step, Value};

pub use tweenline_easing::Easing;
