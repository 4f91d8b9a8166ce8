//! # Resources
//!
//! Singleton, cross-cutting values keyed by their own type: tick time,
//! configuration, shared holders. At most one instance per type; inserting
//! replaces the previous value wholesale.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::time::Duration;

/// Type-keyed table of singleton values.
#[derive(Default)]
pub struct Resources {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Resources {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value`, returning the instance it replaced.
    pub fn insert<R: Send + Sync + 'static>(&mut self, value: R) -> Option<R> {
        self.map
            .insert(TypeId::of::<R>(), Box::new(value))
            .and_then(|old| old.downcast::<R>().ok())
            .map(|old| *old)
    }

    /// Gets the instance of `R`.
    #[must_use]
    pub fn get<R: Send + Sync + 'static>(&self) -> Option<&R> {
        self.map
            .get(&TypeId::of::<R>())
            .and_then(|r| r.downcast_ref::<R>())
    }

    /// Gets the instance of `R` mutably.
    pub fn get_mut<R: Send + Sync + 'static>(&mut self) -> Option<&mut R> {
        self.map
            .get_mut(&TypeId::of::<R>())
            .and_then(|r| r.downcast_mut::<R>())
    }

    /// Gets the instance of `R`, inserting `init()` first if absent.
    pub fn get_or_insert_with<R, F>(&mut self, init: F) -> &mut R
    where
        R: Send + Sync + 'static,
        F: FnOnce() -> R,
    {
        let slot = self
            .map
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(init()));
        match slot.downcast_mut::<R>() {
            Some(value) => value,
            // Entries are only ever inserted under their own TypeId.
            None => unreachable!("resource {} stored under a foreign TypeId", type_name::<R>()),
        }
    }

    /// Removes and returns the instance of `R`.
    pub fn remove<R: Send + Sync + 'static>(&mut self) -> Option<R> {
        self.map
            .remove(&TypeId::of::<R>())
            .and_then(|r| r.downcast::<R>().ok())
            .map(|r| *r)
    }

    /// Checks whether an instance of `R` exists.
    #[must_use]
    pub fn contains<R: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<R>())
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no resources are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Simulated time, maintained by [`World::run_tick`](crate::World::run_tick).
///
/// Systems needing "expire after N seconds" behavior read this instead of a
/// wall clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickClock {
    /// Number of the tick currently executing (first tick is `1`).
    pub tick: u64,
    /// Simulated time since the previous tick.
    pub delta: Duration,
    /// Simulated time since the first tick started.
    pub elapsed: Duration,
}

impl TickClock {
    /// Advances the clock by one tick of length `delta`.
    #[must_use]
    pub fn advance(self, delta: Duration) -> Self {
        Self {
            tick: self.tick + 1,
            delta,
            elapsed: self.elapsed + delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Score(u32);

    #[test]
    fn test_insert_replaces_wholesale() {
        let mut res = Resources::new();
        assert_eq!(res.insert(Score(1)), None);
        assert_eq!(res.insert(Score(2)), Some(Score(1)));
        assert_eq!(res.get::<Score>(), Some(&Score(2)));
        assert_eq!(res.len(), 1);
    }

    #[test]
    fn test_missing_resource_is_none() {
        let mut res = Resources::new();
        assert!(res.get::<Score>().is_none());
        assert!(res.remove::<Score>().is_none());
        assert!(!res.contains::<Score>());
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut res = Resources::new();
        res.get_or_insert_with(|| Score(5)).0 += 1;
        res.get_or_insert_with(|| Score(100)).0 += 1;
        assert_eq!(res.get::<Score>(), Some(&Score(7)));
    }

    #[test]
    fn test_tick_clock_advance() {
        let clock = TickClock::default()
            .advance(Duration::from_millis(16))
            .advance(Duration::from_millis(16));
        assert_eq!(clock.tick, 2);
        assert_eq!(clock.elapsed, Duration::from_millis(32));
    }
}
