// SPDX-License-Identifier: MIT OR Apache-2.0
//! The runner: a registry paired with the driver currently advancing it.

use std::rc::Rc;

use tracing::warn;

use crate::registry::Registry;
use crate::strategy::{DriverError, DriverStrategy};

/// Drives a [`Registry`] with one strategy at a time.
pub struct TimelineRunner {
    registry: Registry,
    strategy: Option<Box<dyn DriverStrategy>>,
}

impl TimelineRunner {
    /// A runner over the given registry with no driver yet; the registry can
    /// still be ticked by hand.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            strategy: None,
        }
    }

    /// The registry being driven.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Swap in a new driver, stopping the old one first so two drive loops
    /// never run at once.
    ///
    /// # Errors
    ///
    /// Surfaces [`DriverError`] from starting the new driver; the old one is
    /// already stopped by then.
    pub fn change_strategy(
        &mut self,
        mut strategy: Box<dyn DriverStrategy>,
    ) -> Result<(), DriverError> {
        if let Some(old) = self.strategy.as_mut() {
            old.stop();
        }
        let registry = self.registry.clone();
        strategy.start(Rc::new(move || {
            if let Err(err) = registry.tick() {
                warn!(%err, "registry tick failed");
            }
        }))?;
        self.strategy = Some(strategy);
        Ok(())
    }

    /// Stop the current driver, if any.
    pub fn stop(&mut self) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.stop();
        }
    }
}

impl std::fmt::Debug for TimelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineRunner")
            .field("registry", &self.registry)
            .field("has_strategy", &self.strategy.is_some())
            .finish()
    }
}
