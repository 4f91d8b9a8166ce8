//! # Entity Management
//!
//! Entities are opaque identifiers with no data of their own:
//! - Issued monotonically by the [`EntityAllocator`]
//! - Never reused while the process runs
//! - Raw value `0` is reserved as the null sentinel

use std::fmt;

/// Unique identifier for an entity.
///
/// Ordering follows issue order, so the lowest id is always the
/// earliest-created entity. Z-index ties are broken on this ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Null/invalid entity. Never returned by [`EntityAllocator::create`].
    pub const NULL: Self = Self(0);

    /// Rebuilds an entity from its raw value.
    ///
    /// Used by the singleton holders, which store entities as a plain word.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value of this entity.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this entity is the null sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Entity(null)")
        } else {
            write!(f, "Entity({})", self.0)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues fresh entity identifiers.
///
/// Holds nothing but a counter. Creation takes `&mut self`, so only the
/// owner of the world (the simulation thread) can mint entities.
#[derive(Debug)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Creates an allocator whose first id is `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns a fresh id, strictly greater than every id issued before.
    ///
    /// # Panics
    ///
    /// Panics if the 64-bit id space is exhausted.
    #[inline]
    pub fn create(&mut self) -> Entity {
        assert!(self.next < u64::MAX, "entity id space exhausted");
        let id = self.next;
        self.next += 1;
        Entity(id)
    }

    /// Number of ids issued so far.
    #[inline]
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
