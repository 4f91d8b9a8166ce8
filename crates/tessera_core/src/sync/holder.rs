//! # Singleton Holders
//!
//! Tracks "the one live entity of kind `K`" in a single atomic word.
//!
//! ## The stale-clear race
//!
//! ```text
//! collector (tick 10):  observes holder = #7, decides to clear
//! spawner   (tick 10):  holder #7 expired, replaces with #9
//! collector (late):     clear()                 → erases #9  (wrong)
//! collector (late):     compare_and_swap_clear(#7) → fails    (right)
//! ```
//!
//! Clearing is therefore always conditional on the id the caller observed.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ecs::Entity;

/// Atomically swappable "current holder" for singleton kind `K`.
///
/// `K` is a marker type naming the singleton; it is never instantiated.
/// Shared across threads as `Arc<SingletonHolder<K>>`.
pub struct SingletonHolder<K> {
    /// Raw entity id, `0` when empty.
    slot: AtomicU64,
    _kind: PhantomData<fn() -> K>,
}

impl<K> SingletonHolder<K> {
    /// Creates an empty holder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: AtomicU64::new(0),
            _kind: PhantomData,
        }
    }

    /// Current holder, `None` when empty.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<Entity> {
        let raw = self.slot.load(Ordering::Acquire);
        (raw != 0).then(|| Entity::from_raw(raw))
    }

    /// Checks if the holder is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current().is_none()
    }

    /// Installs `entity` only if the holder is empty.
    ///
    /// Returns `true` if `entity` is now the holder.
    pub fn set_if_absent(&self, entity: Entity) -> bool {
        if entity.is_null() {
            return false;
        }
        self.slot
            .compare_exchange(0, entity.raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditionally installs `entity` (or clears with [`Entity::NULL`]).
    ///
    /// Returns the previous holder.
    pub fn replace(&self, entity: Entity) -> Option<Entity> {
        let old = self.slot.swap(entity.raw(), Ordering::AcqRel);
        (old != 0).then(|| Entity::from_raw(old))
    }

    /// Clears the holder only if it still equals `expected`.
    ///
    /// Among any number of concurrent callers passing the same `expected`,
    /// exactly one gets `true`.
    pub fn compare_and_swap_clear(&self, expected: Entity) -> bool {
        if expected.is_null() {
            return false;
        }
        self.slot
            .compare_exchange(expected.raw(), 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<K> Default for SingletonHolder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for SingletonHolder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonHolder")
            .field("kind", &std::any::type_name::<K>())
            .field("current", &self.current())
            .finish()
    }
}
