// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered composition: children scheduled at explicit start offsets.
//!
//! A sequence owns its children. Each movement of the sequence's timer
//! reconciles every child against the window `[start, start + length]`:
//! children the playhead sits inside are active and follow it exactly,
//! children behind it rest at their start, children ahead of it rest at
//! their end. Activation and deactivation are edge-triggered, so each
//! movement publishes at most one [`SequenceEvent::Activated`] and one
//! [`SequenceEvent::Deactivated`] per child no matter how far it jumped.
//!
//! A child that the playhead lands on exactly at its end is activated,
//! snapped to its end, and deactivated within the same movement, which is
//! how a child's own completion gets a chance to fire.

use tracing::trace;

use crate::clock::{now_ms, ClockError, Timer, Transition};
use crate::events::EventHub;
use crate::timeline::{Listener, SubscriptionId, Timeline, TimelineEvent, TimelineId};

/// A timeline with the offset it occupies inside a [`Sequence`].
#[derive(Debug)]
pub struct Sequenced<T: Timeline> {
    start_time: f64,
    timeline: T,
}

impl<T: Timeline> Sequenced<T> {
    /// Schedule `timeline` to begin at `start_time` on the sequence's clock.
    #[must_use]
    pub fn new(start_time: f64, timeline: T) -> Self {
        Self {
            start_time: start_time.max(0.0),
            timeline,
        }
    }

    /// Where this item begins, in sequence time.
    #[must_use]
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Where this item ends, in sequence time.
    #[must_use]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.timeline.length()
    }

    /// The scheduled timeline.
    #[must_use]
    pub fn timeline(&self) -> &T {
        &self.timeline
    }

    /// Mutable access to the scheduled timeline.
    pub fn timeline_mut(&mut self) -> &mut T {
        &mut self.timeline
    }
}

/// Active-set changes, published alongside the usual timeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    /// The playhead entered the item's window.
    Activated {
        /// Index of the item, in start-time order.
        index: usize,
    },
    /// The playhead left the item's window.
    Deactivated {
        /// Index of the item, in start-time order.
        index: usize,
    },
}

/// A set of timelines played one after another (or overlapping), each at
/// its own start offset.
///
/// Length is the latest end among the items. Items are kept sorted by
/// start time; indices in events and accessors refer to that order.
#[derive(Debug)]
pub struct Sequence<T: Timeline> {
    timer: Timer,
    items: Vec<Sequenced<T>>,
    active: Vec<bool>,
    events: EventHub<TimelineEvent>,
    sequence_events: EventHub<SequenceEvent>,
}

impl<T: Timeline> Sequence<T> {
    /// A sequence running as of now. Nothing is active until the first
    /// movement.
    #[must_use]
    pub fn new(items: Vec<Sequenced<T>>) -> Self {
        Self::with_timer(items, Timer::new(0.0))
    }

    /// A sequence anchored at an explicit timestamp.
    #[must_use]
    pub fn started_at(items: Vec<Sequenced<T>>, now: f64) -> Self {
        Self::with_timer(items, Timer::started_at(0.0, now))
    }

    fn with_timer(mut items: Vec<Sequenced<T>>, mut timer: Timer) -> Self {
        items.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let length = items
            .iter()
            .fold(0.0_f64, |latest, item| latest.max(item.end_time()));
        timer.set_length(length);
        let active = vec![false; items.len()];
        Self {
            timer,
            items,
            active,
            events: EventHub::new(),
            sequence_events: EventHub::new(),
        }
    }

    /// The items, in start-time order.
    #[must_use]
    pub fn items(&self) -> &[Sequenced<T>] {
        &self.items
    }

    /// Mutable access to the items, for subscribing to their events.
    pub fn items_mut(&mut self) -> &mut [Sequenced<T>] {
        &mut self.items
    }

    /// Whether the playhead currently sits inside the item's window.
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    /// Indices of the items the playhead currently sits inside.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(index, active)| active.then_some(index))
    }

    /// Subscribe to active-set changes.
    pub fn on_sequence(&mut self, listener: Listener<SequenceEvent>) -> SubscriptionId {
        self.sequence_events.subscribe(listener)
    }

    /// Drop an active-set subscription.
    pub fn off_sequence(&mut self, id: SubscriptionId) {
        self.sequence_events.unsubscribe(id);
    }

    /// Seek with an explicit wall-clock timestamp for the re-anchor.
    pub fn seek_at(&mut self, time: f64, now: f64) {
        let tr = self.timer.apply_seek_at(time, now);
        let changes = self.reconcile();
        self.publish(&changes, &tr, true);
    }

    /// Bring every child in line with the playhead, returning the
    /// activation edges crossed. Transitions are edge-triggered and
    /// resting children are only re-seeked when they are out of place, so
    /// running this twice at the same playhead changes nothing.
    fn reconcile(&mut self) -> Vec<SequenceEvent> {
        let playhead = self.timer.local_time();
        let mut changes = Vec::new();
        for index in 0..self.items.len() {
            let start = self.items[index].start_time;
            let end = self.items[index].end_time();
            let length = self.items[index].timeline.length();
            let local = self.items[index].timeline.local_time();

            if playhead < start {
                // Behind: rest at the start. A child never seen yet stays
                // untouched rather than being activated just to be reset.
                self.deactivate(index, &mut changes);
                if local > 0.0 {
                    self.items[index].timeline.seek(0.0);
                }
            } else if playhead > end {
                // Ahead: rest at the end, without activating on the way.
                self.deactivate(index, &mut changes);
                if local < length {
                    self.items[index].timeline.seek(length);
                }
            } else {
                self.activate(index, &mut changes);
                self.items[index].timeline.seek(playhead - start);
                if self.items[index].timeline.local_time() >= length {
                    self.deactivate(index, &mut changes);
                }
            }
        }
        changes
    }

    fn activate(&mut self, index: usize, changes: &mut Vec<SequenceEvent>) {
        if !self.active[index] {
            self.active[index] = true;
            trace!(index, "sequence item activated");
            changes.push(SequenceEvent::Activated { index });
        }
    }

    fn deactivate(&mut self, index: usize, changes: &mut Vec<SequenceEvent>) {
        if self.active[index] {
            self.active[index] = false;
            trace!(index, "sequence item deactivated");
            changes.push(SequenceEvent::Deactivated { index });
        }
    }

    fn publish(&mut self, changes: &[SequenceEvent], tr: &Transition, sought: bool) {
        for change in changes {
            self.sequence_events.publish(change);
        }
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

impl<T: Timeline> Timeline for Sequence<T> {
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
        let changes = self.reconcile();
        self.publish(&changes, &tr, false);
        Ok(())
    }

    fn on(&mut self, listener: Listener<TimelineEvent>) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    fn off(&mut self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }
}

/// Staged construction of a [`Sequence`], appending items back to back.
#[derive(Debug)]
pub struct SequenceBuilder<T: Timeline> {
    latest_end: f64,
    items: Vec<Sequenced<T>>,
}

impl<T: Timeline> SequenceBuilder<T> {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latest_end: 0.0,
            items: Vec::new(),
        }
    }

    /// Add a timeline right after the latest end so far.
    #[must_use]
    pub fn append(self, timeline: T) -> Self {
        self.append_offset(timeline, 0.0)
    }

    /// Add a timeline `offset` milliseconds after (positive) or before
    /// (negative) the latest end so far. Start times never go below zero.
    #[must_use]
    pub fn append_offset(mut self, timeline: T, offset: f64) -> Self {
        let start_time = (self.latest_end + offset).max(0.0);
        let item = Sequenced::new(start_time, timeline);
        self.latest_end = self.latest_end.max(item.end_time());
        self.items.push(item);
        self
    }

    /// Finish into a sequence running as of now.
    #[must_use]
    pub fn build(self) -> Sequence<T> {
        Sequence::new(self.items)
    }

    /// Finish into a sequence anchored at an explicit timestamp.
    #[must_use]
    pub fn build_at(self, now: f64) -> Sequence<T> {
        Sequence::started_at(self.items, now)
    }
}

impl<T: Timeline> Default for SequenceBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sequence_of(starts: &[f64]) -> Sequence<Timer> {
        let items = starts
            .iter()
            .map(|start| Sequenced::new(*start, Timer::unstarted(1000.0)))
            .collect();
        Sequence::started_at(items, 0.0)
    }

    fn local_times(sequence: &Sequence<Timer>) -> Vec<f64> {
        sequence
            .items()
            .iter()
            .map(|item| item.timeline().local_time())
            .collect()
    }

    #[derive(Default)]
    struct EdgeLog {
        activated: Vec<usize>,
        deactivated: Vec<usize>,
    }

    fn track_edges(sequence: &mut Sequence<Timer>) -> Rc<RefCell<EdgeLog>> {
        let log: Rc<RefCell<EdgeLog>> = Rc::default();
        let sink = Rc::clone(&log);
        sequence.on_sequence(Box::new(move |ev| match *ev {
            SequenceEvent::Activated { index } => sink.borrow_mut().activated.push(index),
            SequenceEvent::Deactivated { index } => sink.borrow_mut().deactivated.push(index),
        }));
        log
    }

    #[test]
    fn length_is_the_latest_end() {
        let sequence = sequence_of(&[0.0, 500.0, 1000.0, 1499.0]);
        assert_eq!(sequence.length(), 2499.0);
    }

    #[test]
    fn plays_out_multiple_items_from_start_to_finish() {
        let mut sequence = sequence_of(&[0.0, 500.0, 1000.0, 1499.0]);

        let completions = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&completions);
        sequence.on(Box::new(move |ev| {
            if matches!(ev, TimelineEvent::Completed) {
                *sink.borrow_mut() += 1;
            }
        }));

        assert_eq!(local_times(&sequence), vec![0.0, 0.0, 0.0, 0.0]);
        sequence.seek_at(500.0, 0.0);
        assert_eq!(local_times(&sequence), vec![500.0, 0.0, 0.0, 0.0]);
        sequence.seek_at(1001.0, 0.0);
        assert_eq!(local_times(&sequence), vec![1000.0, 501.0, 1.0, 0.0]);
        sequence.seek_at(1500.0, 0.0);
        assert_eq!(local_times(&sequence), vec![1000.0, 1000.0, 500.0, 1.0]);
        sequence.seek_at(2000.0, 0.0);
        assert_eq!(local_times(&sequence), vec![1000.0, 1000.0, 1000.0, 501.0]);
        sequence.seek_at(2499.0, 0.0);
        assert_eq!(local_times(&sequence), vec![1000.0, 1000.0, 1000.0, 1000.0]);

        assert_eq!(*completions.borrow(), 1);
    }

    #[test]
    fn maintains_its_active_set() {
        let mut sequence = sequence_of(&[0.0, 500.0, 1000.0, 1499.0]);

        let actives = |sequence: &Sequence<Timer>| sequence.active_indices().collect::<Vec<_>>();

        assert_eq!(actives(&sequence), Vec::<usize>::new());
        sequence.seek_at(0.0, 0.0);
        assert_eq!(actives(&sequence), vec![0]);
        sequence.seek_at(500.0, 0.0);
        assert_eq!(actives(&sequence), vec![0, 1]);
        sequence.seek_at(1001.0, 0.0);
        assert_eq!(actives(&sequence), vec![1, 2]);
        sequence.seek_at(1500.0, 0.0);
        assert_eq!(actives(&sequence), vec![2, 3]);
        sequence.seek_at(2000.0, 0.0);
        assert_eq!(actives(&sequence), vec![3]);
        sequence.seek_at(2500.0, 0.0);
        assert_eq!(actives(&sequence), Vec::<usize>::new());
    }

    #[test]
    fn seeking_backwards_rewinds_children_and_reactivates() {
        let mut sequence = sequence_of(&[0.0, 500.0]);

        sequence.seek_at(1000.0, 0.0);
        sequence.seek_at(500.0, 1.0);
        assert_eq!(local_times(&sequence), vec![500.0, 0.0]);
        assert!(sequence.is_active(0));
        assert!(sequence.is_active(1));
    }

    #[test]
    fn fires_edges_once_each_when_playing_normally() {
        let mut sequence = sequence_of(&[0.0, 500.0, 1000.0]);
        let log = track_edges(&mut sequence);

        sequence.seek_at(0.0, 0.0);
        assert_eq!(log.borrow().activated, vec![0]);
        sequence.seek_at(499.0, 0.0);
        assert_eq!(log.borrow().activated, vec![0]);
        sequence.seek_at(500.0, 0.0);
        assert_eq!(log.borrow().activated, vec![0, 1]);
        sequence.seek_at(999.0, 0.0);
        assert_eq!(log.borrow().deactivated, Vec::<usize>::new());
        sequence.seek_at(1000.0, 0.0);
        assert_eq!(log.borrow().activated, vec![0, 1, 2]);
        assert_eq!(log.borrow().deactivated, vec![0]);
        sequence.seek_at(1500.0, 0.0);
        assert_eq!(log.borrow().deactivated, vec![0, 1]);
        sequence.seek_at(2000.0, 0.0);
        assert_eq!(log.borrow().deactivated, vec![0, 1, 2]);
    }

    #[test]
    fn fires_edges_once_each_across_far_jumps() {
        let mut sequence = sequence_of(&[0.0, 500.0, 1600.0]);
        let log = track_edges(&mut sequence);

        // Jumping over item 0 entirely never activates it; item 1 is swept
        // through because the playhead lands exactly on its end.
        sequence.seek_at(1500.0, 0.0);
        assert_eq!(log.borrow().activated, vec![1]);
        assert_eq!(log.borrow().deactivated, vec![1]);

        sequence.seek_at(0.0, 0.0);
        assert_eq!(log.borrow().activated, vec![1, 0]);
        assert_eq!(log.borrow().deactivated, vec![1]);

        // A jump far past the end clamps to length, which is item 2's end,
        // so item 2 is swept through in one movement.
        sequence.seek_at(500_000.0, 0.0);
        assert_eq!(log.borrow().activated, vec![1, 0, 2]);
        assert_eq!(log.borrow().deactivated, vec![1, 0, 2]);

        sequence.seek_at(400.0, 0.0);
        assert_eq!(log.borrow().activated, vec![1, 0, 2, 0]);
        assert_eq!(log.borrow().deactivated, vec![1, 0, 2]);

        sequence.seek_at(1700.0, 0.0);
        assert_eq!(log.borrow().activated, vec![1, 0, 2, 0, 2]);
        assert_eq!(log.borrow().deactivated, vec![1, 0, 2, 0]);

        sequence.seek_at(2600.0, 0.0);
        assert_eq!(log.borrow().deactivated, vec![1, 0, 2, 0, 2]);
    }

    #[test]
    fn reconciling_twice_at_the_same_playhead_is_idempotent() {
        let mut sequence = sequence_of(&[0.0, 500.0]);
        sequence.seek_at(700.0, 0.0);
        let log = track_edges(&mut sequence);

        sequence.seek_at(700.0, 1.0);
        assert!(log.borrow().activated.is_empty());
        assert!(log.borrow().deactivated.is_empty());
        assert_eq!(local_times(&sequence), vec![700.0, 200.0]);
    }

    #[test]
    fn items_are_sorted_by_start_time() {
        let items = vec![
            Sequenced::new(900.0, Timer::unstarted(100.0)),
            Sequenced::new(0.0, Timer::unstarted(100.0)),
        ];
        let sequence = Sequence::started_at(items, 0.0);
        assert_eq!(sequence.items()[0].start_time(), 0.0);
        assert_eq!(sequence.items()[1].start_time(), 900.0);
    }

    #[test]
    fn update_drives_the_same_reconcile_as_seek() {
        let mut sequence = sequence_of(&[0.0, 500.0]);
        sequence.update_at(750.0).unwrap();
        assert_eq!(local_times(&sequence), vec![750.0, 250.0]);
        assert_eq!(sequence.active_indices().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn builder_appends_back_to_back_and_with_offsets() {
        let sequence = SequenceBuilder::new()
            .append(Timer::unstarted(1000.0))
            .append(Timer::unstarted(500.0))
            .append_offset(Timer::unstarted(200.0), -100.0)
            .build_at(0.0);

        let starts: Vec<f64> = sequence
            .items()
            .iter()
            .map(Sequenced::start_time)
            .collect();
        assert_eq!(starts, vec![0.0, 1000.0, 1400.0]);
        assert_eq!(sequence.length(), 1600.0);
    }

    #[test]
    fn builder_clamps_negative_start_times_to_zero() {
        let sequence = SequenceBuilder::new()
            .append_offset(Timer::unstarted(100.0), -50.0)
            .build_at(0.0);
        assert_eq!(sequence.items()[0].start_time(), 0.0);
    }
}
