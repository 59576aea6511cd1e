//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a plain 64-bit handle handed out by a monotonic
//! counter. Ids are never recycled while the owning
//! [`EntityManager`](crate::manager::EntityManager) is alive, so a handle to a
//! deleted entity can never alias a newer one.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// An opaque, process-unique entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Sentinel that is never returned by an allocator.
    pub const INVALID: EntityId = EntityId(0);

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw `u64` representation.
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is [`EntityId::INVALID`].
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out monotonically increasing [`EntityId`]s.
///
/// There is no free-list: retired ids stay retired. Ids start at 1 so that
/// `0` can serve as [`EntityId::INVALID`].
#[derive(Debug)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Create a new allocator.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate a fresh [`EntityId`].
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Whether `id` was ever returned by this allocator.
    pub fn was_allocated(&self, id: EntityId) -> bool {
        id.is_valid() && id.0 < self.next
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_unique_ids() {
        let mut alloc = EntityAllocator::new();
        let mut ids: Vec<EntityId> = (0..100).map(|_| alloc.allocate()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn ids_are_monotonic_and_never_invalid() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert!(a.is_valid());
        assert!(a < b);
        assert!(alloc.was_allocated(b));
    }

    #[test]
    fn was_allocated_tracks_issued_range() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.was_allocated(a));
        assert!(!alloc.was_allocated(EntityId::INVALID));
        assert!(!alloc.was_allocated(EntityId::from_raw(a.to_raw() + 1)));
    }

    #[test]
    fn entity_id_roundtrip() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.to_raw(), 42);
        assert_eq!(format!("{id}"), "#42");
        assert_eq!(format!("{id:?}"), "EntityId(42)");
    }
}
