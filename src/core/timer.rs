//! One-shot timer service
//!
//! Continuations are plain data: the timer hands due payloads back to the
//! caller on [`Timer::advance`], and the caller decides what they mean. A
//! payload never runs before its deadline, but it may run later than it if
//! frames are long.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use rustc_hash::FxHashSet;

/// Handle to a scheduled continuation, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Scheduled<T> {
    deadline: Duration,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    // Reversed so the max-heap pops the earliest deadline first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Schedules payloads to be returned after a delay.
///
/// # Performance
///
/// | Operation       | Time Complexity |
/// |-----------------|-----------------|
/// | `schedule_once` | O(log n)        |
/// | `cancel`        | O(1)            |
/// | `advance`       | O(k log n)      |
#[derive(Debug)]
pub struct Timer<T> {
    now: Duration,
    queue: BinaryHeap<Scheduled<T>>,
    /// Sequence numbers scheduled and not yet fired or cancelled
    live: FxHashSet<u64>,
    next_seq: u64,
}

impl<T> Timer<T> {
    /// Create an empty timer at time zero
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            queue: BinaryHeap::new(),
            live: FxHashSet::default(),
            next_seq: 0,
        }
    }

    /// Schedule `payload` to come due `delay` from now.
    ///
    /// Deadlines past the end of representable time saturate and never
    /// come due.
    pub fn schedule_once(&mut self, delay: Duration, payload: T) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(seq);
        self.queue.push(Scheduled {
            deadline: self.now.saturating_add(delay),
            seq,
            payload,
        });
        TimerHandle(seq)
    }

    /// Cancel a scheduled payload.
    ///
    /// Returns `false` if the handle already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.live.remove(&handle.0)
    }

    /// Advance time and return every payload whose deadline has passed,
    /// earliest first (ties in scheduling order)
    pub fn advance(&mut self, delta: Duration) -> Vec<T> {
        self.now = self.now.saturating_add(delta);

        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|s| s.deadline <= self.now && s.deadline < Duration::MAX)
        {
            if let Some(scheduled) = self.queue.pop() {
                if self.live.remove(&scheduled.seq) {
                    due.push(scheduled.payload);
                }
            }
        }
        due
    }

    /// Current timer time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of payloads still waiting
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// Drop every scheduled payload
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Self::new()
    }
}
