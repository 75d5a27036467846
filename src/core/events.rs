//! Event Queue for Engine Signals
//!
//! A double-buffered queue that carries engine signals (collisions,
//! visibility changes, sleeping bodies) into the pooling system. Signals are
//! written during one frame and processed in the next, so the order systems
//! run in never changes what the pools observe.
//!
//! # Example
//!
//! ```ignore
//! // Physics step
//! queue.push(Signal::BodySleeping { node });
//!
//! // Next frame
//! queue.swap();
//! for signal in queue.drain() {
//!     pools.handle_signal(&mut world, &signal)?;
//! }
//! ```

use std::collections::VecDeque;

/// Double-buffered signal queue.
///
/// Anything pushed during frame N becomes readable after the swap that
/// starts frame N+1. Both buffers are reused, so steady-state frames do not
/// allocate.
#[derive(Debug)]
pub struct EventQueue<E> {
    /// Written this frame
    pending: VecDeque<E>,
    /// Swapped in from the previous frame
    ready: VecDeque<E>,
}

impl<E> EventQueue<E> {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            ready: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next frame.
    #[inline]
    pub fn push(&mut self, event: E) {
        self.pending.push_back(event);
    }

    /// Make this frame's events readable.
    ///
    /// Call this once per frame. Events from the previous frame that were
    /// never drained are dropped.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.ready);
        self.pending.clear();
    }

    /// Iterate over events from the previous frame.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.ready.iter()
    }

    /// Drain all events from the previous frame.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.ready.drain(..)
    }

    /// Check if nothing is ready to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Number of events ready to process.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    /// Get the number of events pending for next frame.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and ready).
    ///
    /// Used on scene transitions, where queued signals refer to nodes that
    /// are about to disappear.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.ready.clear();
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
