//! Virtual-time timer queue
//!
//! Services never sleep. Work that should happen "later" is scheduled as an
//! event on a [`TimerQueue`]; the owner pops due events while stepping the
//! queue forward through simulated time. Events due at the same instant fire
//! in scheduling order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// A point in simulated time, measured from the start of the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(Duration);

impl SimTime {
    /// Simulation start
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Time `ms` milliseconds after start
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Elapsed time since simulation start
    #[inline]
    #[must_use]
    pub const fn since_start(self) -> Duration {
        self.0
    }

    /// Milliseconds since simulation start
    #[inline]
    #[must_use]
    pub fn as_millis(self) -> u128 {
        self.0.as_millis()
    }

    /// Duration from `earlier` to `self`, zero if `earlier` is later
    #[inline]
    #[must_use]
    pub fn saturating_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}ms", self.0.as_millis())
    }
}

/// Handle to a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Deterministic queue of events keyed by due time
///
/// Cancelled events are dropped from the pending map immediately and their
/// heap entries are discarded lazily.
pub struct TimerQueue<E> {
    now: SimTime,
    next_id: u64,
    heap: BinaryHeap<Reverse<(SimTime, TimerId)>>,
    pending: HashMap<TimerId, E>,
}

impl<E> TimerQueue<E> {
    /// Create an empty queue at [`SimTime::ZERO`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_id: 0,
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
        }
    }

    /// Current simulated time of this queue
    #[inline]
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `event` to fire `delay` after the current time
    pub fn schedule(&mut self, delay: Duration, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Reverse((self.now + delay, id)));
        self.pending.insert(id, event);
        id
    }

    /// Cancel a pending event, returning it if it had not fired yet
    pub fn cancel(&mut self, id: TimerId) -> Option<E> {
        self.pending.remove(&id)
    }

    /// Check if an event is still waiting to fire
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of pending events
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
    }

    /// Due time of the earliest pending event
    pub fn next_deadline(&mut self) -> Option<SimTime> {
        while let Some(&Reverse((due, id))) = self.heap.peek() {
            if self.pending.contains_key(&id) {
                return Some(due);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop the earliest event due at or before `until`
    ///
    /// The queue clock moves to the event's due time, so anything scheduled
    /// while handling it is relative to that instant.
    pub fn pop_due(&mut self, until: SimTime) -> Option<(TimerId, E)> {
        while let Some(&Reverse((due, id))) = self.heap.peek() {
            if due > until {
                return None;
            }
            self.heap.pop();
            if let Some(event) = self.pending.remove(&id) {
                if due > self.now {
                    self.now = due;
                }
                return Some((id, event));
            }
        }
        None
    }

    /// Move the clock to `to` without firing anything; never goes backwards
    pub fn settle(&mut self, to: SimTime) {
        if to > self.now {
            self.now = to;
        }
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for TimerQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(300), "c");
        q.schedule(ms(100), "a");
        q.schedule(ms(200), "b");

        let until = SimTime::from_millis(1000);
        let fired: Vec<_> = std::iter::from_fn(|| q.pop_due(until).map(|(_, e)| e)).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert_eq!(q.now(), SimTime::from_millis(300));
    }

    #[test]
    fn same_instant_is_fifo() {
        let mut q = TimerQueue::new();
        q.schedule(ms(50), 1);
        q.schedule(ms(50), 2);
        q.schedule(ms(50), 3);

        let until = SimTime::from_millis(50);
        let fired: Vec<_> = std::iter::from_fn(|| q.pop_due(until).map(|(_, e)| e)).collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn not_due_stays_queued() {
        let mut q = TimerQueue::new();
        q.schedule(ms(500), ());
        assert!(q.pop_due(SimTime::from_millis(499)).is_none());
        assert_eq!(q.len(), 1);
        assert!(q.pop_due(SimTime::from_millis(500)).is_some());
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_never_fires() {
        let mut q = TimerQueue::new();
        let a = q.schedule(ms(10), "a");
        q.schedule(ms(20), "b");

        assert_eq!(q.cancel(a), Some("a"));
        assert!(!q.is_pending(a));
        assert_eq!(q.cancel(a), None);

        assert_eq!(q.next_deadline(), Some(SimTime::from_millis(20)));
        let (_, e) = q.pop_due(SimTime::from_millis(100)).unwrap();
        assert_eq!(e, "b");
        assert!(q.pop_due(SimTime::from_millis(100)).is_none());
    }

    #[test]
    fn scheduling_is_relative_to_last_fired() {
        let mut q = TimerQueue::new();
        q.schedule(ms(100), 0);
        q.pop_due(SimTime::from_millis(1000)).unwrap();
        q.schedule(ms(100), 1);
        assert_eq!(q.next_deadline(), Some(SimTime::from_millis(200)));
    }

    #[test]
    fn settle_never_rewinds() {
        let mut q: TimerQueue<()> = TimerQueue::new();
        q.settle(SimTime::from_millis(40));
        q.settle(SimTime::from_millis(10));
        assert_eq!(q.now(), SimTime::from_millis(40));
    }

    #[test]
    fn clear_drops_everything() {
        let mut q = TimerQueue::new();
        q.schedule(ms(1), 'x');
        q.schedule(ms(2), 'y');
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.next_deadline(), None);
    }

    proptest! {
        #[test]
        fn prop_pop_order_is_monotonic(delays in proptest::collection::vec(0u64..10_000, 1..64)) {
            let mut q = TimerQueue::new();
            for (i, d) in delays.iter().enumerate() {
                q.schedule(ms(*d), i);
            }

            let mut last = SimTime::ZERO;
            let mut count = 0;
            while let Some((_, i)) = q.pop_due(SimTime::from_millis(10_000)) {
                let due = SimTime::from_millis(delays[i]);
                prop_assert!(due >= last);
                last = due;
                count += 1;
            }
            prop_assert_eq!(count, delays.len());
        }
    }
}
