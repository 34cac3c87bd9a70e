// SPDX-License-Identifier: MIT OR Apache-2.0
//! The set of timelines currently being driven.
//!
//! A [`Registry`] is an explicit, cheaply clonable handle: each clone refers
//! to the same underlying set, and independent registries never interact.
//! Registering a timeline wires listeners onto it once; from then on the
//! timeline manages its own membership. Completion and stopping take it out,
//! and seeking backwards into range puts it back in, whether the seek came
//! from the registry's own fan-out or from the embedding application.
//!
//! The listeners touch only the registry, never the timeline that published
//! the event, so they are safe to run while that timeline is borrowed
//! mid-mutation.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use tweenline_core::{now_ms, ClockError, Stopwatch, Timeline, TimelineEvent, TimelineId};

/// A shared, dynamically typed timeline handle.
pub type SharedTimeline = Rc<RefCell<dyn Timeline>>;

struct Wiring {
    handle: Weak<RefCell<dyn Timeline>>,
    subscription: tweenline_core::SubscriptionId,
}

struct RegistryInner {
    clock: Stopwatch,
    running: IndexMap<TimelineId, SharedTimeline>,
    wired: IndexMap<TimelineId, Wiring>,
}

/// A self-maintaining set of timelines advanced together by [`Registry::tick`].
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl Registry {
    /// An empty registry whose clock is anchored as of now.
    #[must_use]
    pub fn new() -> Self {
        Self::started_at(now_ms())
    }

    /// An empty registry anchored at an explicit timestamp.
    #[must_use]
    pub fn started_at(now: f64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                clock: Stopwatch::started_at(now),
                running: IndexMap::new(),
                wired: IndexMap::new(),
            })),
        }
    }

    /// Add a timeline to the running set, wiring its listeners on first
    /// sight. Registering an already-registered timeline does nothing.
    pub fn register(&self, handle: &SharedTimeline) {
        let (id, length) = {
            let timeline = handle.borrow();
            (timeline.id(), timeline.length())
        };

        let mut inner = self.inner.borrow_mut();
        if inner.running.contains_key(&id) {
            return;
        }
        inner.running.insert(id, Rc::clone(handle));
        if inner.wired.contains_key(&id) {
            return;
        }
        drop(inner);

        debug!(timeline = %id.0, "registering timeline");
        let registry = Rc::downgrade(&self.inner);
        let weak_handle = Rc::downgrade(handle);
        let subscription = handle.borrow_mut().on(Box::new(move |ev| {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            match ev {
                TimelineEvent::Completed | TimelineEvent::Stopped => {
                    trace!(timeline = %id.0, "timeline finished, dropping from registry");
                    inner.borrow_mut().running.shift_remove(&id);
                }
                TimelineEvent::Sought { to, .. } => {
                    if *to >= length {
                        inner.borrow_mut().running.shift_remove(&id);
                    } else if let Some(handle) = weak_handle.upgrade() {
                        inner.borrow_mut().running.insert(id, handle);
                    }
                }
                _ => {}
            }
        }));

        self.inner.borrow_mut().wired.insert(
            id,
            Wiring {
                handle: Rc::downgrade(handle),
                subscription,
            },
        );
    }

    /// Take a timeline out of the running set. Its wiring stays, so a later
    /// seek back into range re-registers it.
    pub fn unregister(&self, id: TimelineId) {
        self.inner.borrow_mut().running.shift_remove(&id);
    }

    /// Whether the timeline is currently being driven.
    #[must_use]
    pub fn contains(&self, id: TimelineId) -> bool {
        self.inner.borrow().running.contains_key(&id)
    }

    /// Number of timelines currently being driven.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().running.len()
    }

    /// Whether nothing is currently being driven.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().running.is_empty()
    }

    /// Advance every registered timeline by one shared wall-clock delta.
    ///
    /// The delta is measured once on the registry's own clock, then applied
    /// to each timeline as `seek(local_time + delta)`. Timelines that finish
    /// fall out through their own listeners. The running set is snapshotted
    /// up front, so membership changes during fan-out are safe.
    ///
    /// # Errors
    ///
    /// Propagates [`ClockError`] from the registry clock.
    pub fn tick(&self) -> Result<(), ClockError> {
        self.tick_at(now_ms())
    }

    /// [`Registry::tick`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Propagates [`ClockError`] from the registry clock.
    pub fn tick_at(&self, now: f64) -> Result<(), ClockError> {
        let (dt, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            let dt = inner.clock.tick(now)?;
            let snapshot: Vec<SharedTimeline> = inner.running.values().cloned().collect();
            (dt, snapshot)
        };
        for handle in snapshot {
            let target = handle.borrow().local_time() + dt;
            handle.borrow_mut().seek(target);
        }
        Ok(())
    }

    /// Unsubscribe from every wired timeline and forget all of them.
    pub fn teardown(&self) {
        let wired = {
            let mut inner = self.inner.borrow_mut();
            inner.running.clear();
            std::mem::take(&mut inner.wired)
        };
        for (id, wiring) in wired {
            if let Some(handle) = wiring.handle.upgrade() {
                trace!(timeline = %id.0, "unwiring timeline");
                handle.borrow_mut().off(wiring.subscription);
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Registry")
            .field("running", &inner.running.len())
            .field("wired", &inner.wired.len())
            .finish()
    }
}
