// SPDX-License-Identifier: MIT OR Apache-2.0
//! Driver strategies: how ticks reach the registry.
//!
//! A driver is handed one tick callback when started and invokes it however
//! it likes. At most one start per driver: running two drive loops against
//! the same registry would double-apply time, so a second `start` is
//! rejected rather than silently stacked.
//!
//! Only the manual driver lives here. The tick callback is `!Send`, so
//! wall-clock drivers (frame loops, interval timers) belong to the embedding
//! application; any of them can implement [`DriverStrategy`].

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

/// The callback a driver invokes to advance the registry.
pub type TickFn = Rc<dyn Fn()>;

/// Driver lifecycle violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    /// `start` was called on a driver that is already driving.
    #[error("driver is already running")]
    AlreadyRunning,

    /// A tick was requested before the driver was started.
    #[error("driver has not been started")]
    NotStarted,

    /// A tick was requested after the driver was stopped.
    #[error("driver has been stopped")]
    Stopped,
}

/// Something that can invoke a tick callback over time.
pub trait DriverStrategy {
    /// Begin driving with the given callback.
    ///
    /// # Errors
    ///
    /// [`DriverError::AlreadyRunning`] when the driver is already driving.
    fn start(&mut self, tick: TickFn) -> Result<(), DriverError>;

    /// Stop driving. Idempotent.
    fn stop(&mut self);
}

#[derive(Default)]
struct ManualInner {
    tick: Option<TickFn>,
    stopped: bool,
}

/// A driver that only ticks when told to.
///
/// Clones share the same state, so the caller can keep one handle for
/// [`ManualDriver::step`] after boxing another into a runner.
#[derive(Clone, Default)]
pub struct ManualDriver {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualDriver {
    /// A driver that has not been started yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke the tick callback once.
    ///
    /// # Errors
    ///
    /// [`DriverError::NotStarted`] before `start`, [`DriverError::Stopped`]
    /// after `stop`.
    pub fn step(&self) -> Result<(), DriverError> {
        let tick = {
            let inner = self.inner.borrow();
            if inner.stopped {
                return Err(DriverError::Stopped);
            }
            inner.tick.clone().ok_or(DriverError::NotStarted)?
        };
        tick();
        Ok(())
    }
}

impl DriverStrategy for ManualDriver {
    fn start(&mut self, tick: TickFn) -> Result<(), DriverError> {
        let mut inner = self.inner.borrow_mut();
        if inner.tick.is_some() && !inner.stopped {
            return Err(DriverError::AlreadyRunning);
        }
        inner.tick = Some(tick);
        inner.stopped = false;
        Ok(())
    }

    fn stop(&mut self) {
        self.inner.borrow_mut().stopped = true;
    }
}

impl std::fmt::Debug for ManualDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ManualDriver")
            .field("started", &inner.tick.is_some())
            .field("stopped", &inner.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_before_start_is_rejected() {
        let driver = ManualDriver::new();
        assert_eq!(driver.step(), Err(DriverError::NotStarted));
    }

    #[test]
    fn step_invokes_the_tick_callback() {
        let mut driver = ManualDriver::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        driver
            .start(Rc::new(move || *sink.borrow_mut() += 1))
            .unwrap();

        driver.step().unwrap();
        driver.step().unwrap();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn starting_twice_is_rejected() {
        let mut driver = ManualDriver::new();
        driver.start(Rc::new(|| {})).unwrap();
        assert_eq!(driver.start(Rc::new(|| {})), Err(DriverError::AlreadyRunning));
    }

    #[test]
    fn step_after_stop_is_rejected() {
        let mut driver = ManualDriver::new();
        driver.start(Rc::new(|| {})).unwrap();
        driver.stop();
        assert_eq!(driver.step(), Err(DriverError::Stopped));
    }

    #[test]
    fn a_stopped_driver_may_be_restarted() {
        let mut driver = ManualDriver::new();
        driver.start(Rc::new(|| {})).unwrap();
        driver.stop();
        driver.start(Rc::new(|| {})).unwrap();
        assert_eq!(driver.step(), Ok(()));
    }

    #[test]
    fn clones_share_lifecycle_state() {
        let mut driver = ManualDriver::new();
        let handle = driver.clone();
        assert_eq!(handle.step(), Err(DriverError::NotStarted));
        driver.start(Rc::new(|| {})).unwrap();
        assert_eq!(handle.step(), Ok(()));
    }
}
