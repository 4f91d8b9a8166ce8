//! # Component Storage
//!
//! One [`Store`] per component kind, keyed by entity.
//!
//! The world keeps stores behind the object-safe [`AnyStore`] trait so that
//! entity destruction can fan out to every kind, and the z-index resolver can
//! test membership by `TypeId` without knowing the concrete type.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::Component;
use super::entity::Entity;

/// Storage for a single component type.
///
/// Keys are unique. Iteration order is unspecified but stable for a given
/// store state.
///
/// # Example
///
/// ```rust,ignore
/// let mut store: Store<Glyph> = Store::new();
/// store.add(entity, Glyph { ch: 'a' });
/// assert!(store.has(entity));
/// ```
pub struct Store<T: Component> {
    data: HashMap<Entity, T>,
}

impl<T: Component> Store<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Creates an empty store with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts or replaces the component for `entity`.
    ///
    /// Returns the replaced value, if any.
    #[inline]
    pub fn add(&mut self, entity: Entity, value: T) -> Option<T> {
        self.data.insert(entity, value)
    }

    /// Gets the component for `entity`.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.data.get(&entity)
    }

    /// Gets a mutable reference to the component for `entity`.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.data.get_mut(&entity)
    }

    /// Checks if `entity` has this component.
    #[inline]
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.data.contains_key(&entity)
    }

    /// Removes the component for `entity`. No-op when absent.
    #[inline]
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.data.remove(&entity)
    }

    /// Number of entities holding this component.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no entity holds this component.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over `(entity, component)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.data.iter().map(|(e, c)| (*e, c))
    }

    /// Iterates mutably over `(entity, component)` pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.data.iter_mut().map(|(e, c)| (*e, c))
    }

    /// Owned copy of the entity list.
    ///
    /// Walk this instead of [`Store::iter`] when entries must be added or
    /// removed along the way.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.data.keys().copied().collect()
    }

    /// Owned, id-ordered copy of every entry.
    ///
    /// Nothing in the result borrows from the store.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Entity, T)> {
        let mut out: Vec<(Entity, T)> = self
            .data
            .iter()
            .map(|(e, c)| (*e, c.clone()))
            .collect();
        out.sort_unstable_by_key(|(e, _)| *e);
        out
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<T: Component> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a [`Store`].
pub trait AnyStore: Send + Sync {
    /// Removes `entity` from the store if present.
    fn remove_entity(&mut self, entity: Entity);

    /// Checks if `entity` has an entry in the store.
    fn contains(&self, entity: Entity) -> bool;

    /// Number of entries.
    fn entry_count(&self) -> usize;

    /// Name of the stored component kind.
    fn kind_name(&self) -> &'static str;

    /// Upcast for checked downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for checked downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStore for Store<T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn contains(&self, entity: Entity) -> bool {
        self.has(entity)
    }

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn kind_name(&self) -> &'static str {
        T::kind_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All component stores of a world, keyed by component `TypeId`.
#[derive(Default)]
pub struct Stores {
    map: HashMap<TypeId, Box<dyn AnyStore>>,
}

impl Stores {
    /// Creates an empty store table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store for `T`, if one was ever registered.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&Store<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<Store<T>>())
    }

    /// Returns the store for `T`, registering an empty one on first use.
    pub fn get_or_register<T: Component>(&mut self) -> &mut Store<T> {
        let store = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Store::<T>::new()));
        match store.as_any_mut().downcast_mut::<Store<T>>() {
            Some(store) => store,
            // Entries are only ever inserted under their own TypeId.
            None => unreachable!("store registered under a foreign TypeId"),
        }
    }

    /// Returns the mutable store for `T` if registered.
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut Store<T>> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<Store<T>>())
    }

    /// Checks whether `entity` has a component of kind `type_id`.
    #[must_use]
    pub fn contains(&self, type_id: TypeId, entity: Entity) -> bool {
        self.map.get(&type_id).is_some_and(|s| s.contains(entity))
    }

    /// Removes `entity` from every store.
    pub fn remove_entity(&mut self, entity: Entity) {
        for store in self.map.values_mut() {
            store.remove_entity(entity);
        }
    }

    /// Number of registered component kinds.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.map.len()
    }

    /// Names of every registered component kind that `entity` carries.
    #[must_use]
    pub fn kinds_of(&self, entity: Entity) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self
            .map
            .values()
            .filter(|s| s.contains(entity))
            .map(|s| s.kind_name())
            .collect();
        kinds.sort_unstable();
        kinds
    }
}
