//! Pool and instance identifiers

use std::fmt;

/// Opaque identity of a prototype's pool.
///
/// Issued by the directory when a pool is registered. The same prototype
/// keeps the same id until its pool is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrototypeId(u64);

impl PrototypeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PrototypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// A pooled instance handed out by [`crate::pool::Pool::acquire`].
///
/// The handle names the scene node, the pool that owns it, its slot in
/// creation order, and the activation cycle it was handed out in. A handle
/// from an earlier cycle is stale: releasing through it does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle<N> {
    node: N,
    prototype: PrototypeId,
    slot: usize,
    generation: u32,
}

impl<N: Copy> InstanceHandle<N> {
    pub(crate) const fn new(node: N, prototype: PrototypeId, slot: usize, generation: u32) -> Self {
        Self {
            node,
            prototype,
            slot,
            generation,
        }
    }

    /// Scene node of the instance
    #[inline]
    pub fn node(&self) -> N {
        self.node
    }

    /// Pool that owns the instance
    #[inline]
    pub fn prototype(&self) -> PrototypeId {
        self.prototype
    }

    /// Position of the instance in its pool's creation order
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Activation cycle this handle belongs to
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
