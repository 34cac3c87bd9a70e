// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed event publication.
//!
//! Every timeline node owns one or more [`EventHub`]s instead of inheriting
//! from an emitter base class. Listeners receive a shared reference to the
//! event payload and never the node itself, so by the time a listener runs,
//! the publishing node has already settled all of its derived state.

use std::fmt;

/// Identifies a listener registered on an [`EventHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A boxed event listener.
pub type Listener<E> = Box<dyn FnMut(&E)>;

/// An ordered list of listeners for one event type.
pub struct EventHub<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> EventHub<E> {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a listener. Listeners are invoked in subscription order.
    pub fn subscribe(&mut self, listener: Listener<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(sid, _)| *sid != id);
    }

    /// Deliver an event to every listener, in subscription order.
    pub fn publish(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
