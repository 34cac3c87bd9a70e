// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline driving for Tweenline.
//!
//! This crate keeps timelines moving without anyone holding an update loop:
//! - A registry of running timelines, advanced together by one shared delta
//! - Self-maintaining membership (completion and stopping drop a timeline,
//!   seeking back into range restores it)
//! - Pluggable driver strategies deciding when ticks happen
//!
//! ## Architecture
//!
//! Everything here is single-threaded and explicit:
//! - [`Registry`] is a clonable handle; independent instances never interact
//! - [`DriverStrategy`] is the seam for frame loops and interval timers
//! - [`TimelineRunner`] pairs the two, one driver at a time

pub mod registry;
pub mod runner;
pub mod strategy;

pub use registry::{Registry, SharedTimeline};
pub use runner::TimelineRunner;
pub use strategy::{DriverError, DriverStrategy, ManualDriver, TickFn};
