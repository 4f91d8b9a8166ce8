//! # ECS World
//!
//! The single owner of simulation state: entity lifecycle, component
//! stores, the spatial index, resources and the system schedule.
//!
//! ## Tick
//!
//! ```text
//! run_tick(delta)
//!   1. events.dispatch()        dropped subscriptions are pruned
//!   2. TickClock += delta
//!   3. systems, ascending priority
//! ```
//!
//! Everything here takes `&mut self`; only the simulation thread touches
//! the world. Other threads go through [`World::events`] or a
//! [`SingletonHolder`].

use std::any::type_name;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::component::Component;
use super::entity::{Entity, EntityAllocator};
use super::resource::{Resources, TickClock};
use super::spatial::{Point, SpatialIndex};
use super::storage::{Store, Stores};
use super::system::{Schedule, System};
use super::zindex::ZIndex;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::EventRouter;
use crate::sync::SingletonHolder;

/// The ECS world.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Component, World, ZIndex};
///
/// #[derive(Clone)]
/// struct Cursor;
/// impl Component for Cursor {}
///
/// let mut world = World::new();
/// world.set_z_index(ZIndex::builder().layer::<Cursor>(1000).build());
///
/// let cursor = world.create_entity();
/// world.insert(cursor, Cursor);
/// world.protect(cursor);
/// world.set_position(cursor, 3, 4);
///
/// assert_eq!(world.top_entity_at(3, 4), Some(cursor));
/// assert!(!world.destroy_entity(cursor));
/// ```
pub struct World {
    allocator: EntityAllocator,
    alive: HashSet<Entity>,
    protected: HashSet<Entity>,
    stores: Stores,
    spatial: SpatialIndex,
    zindex: ZIndex,
    resources: Resources,
    /// Empty while a tick runs; systems added meanwhile land here.
    schedule: Schedule,
    events: Arc<EventRouter>,
}

impl World {
    /// Creates a world with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&CoreConfig::default())
    }

    /// Creates a world sized and wired per `config`.
    #[must_use]
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::with_router(config, Arc::new(EventRouter::new(config.events)))
    }

    /// Creates a world around an existing event router.
    ///
    /// Lets producers grab the router before the world exists.
    #[must_use]
    pub fn with_router(config: &CoreConfig, events: Arc<EventRouter>) -> Self {
        let capacity = config.world.initial_capacity;
        Self {
            allocator: EntityAllocator::new(),
            alive: HashSet::with_capacity(capacity),
            protected: HashSet::new(),
            stores: Stores::new(),
            spatial: SpatialIndex::with_capacity(capacity),
            zindex: ZIndex::default(),
            resources: Resources::new(),
            schedule: Schedule::new(),
            events,
        }
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates an entity with no components and no position.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.create();
        self.alive.insert(entity);
        entity
    }

    /// Destroys `entity`: removes it from every store and the spatial index.
    ///
    /// Idempotent. Protected entities are refused. Returns `true` if the
    /// entity was alive and is now gone.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if self.protected.contains(&entity) {
            tracing::debug!(%entity, "refused to destroy protected entity");
            return false;
        }
        self.despawn(entity)
    }

    /// Destroys `entity` even if it is protected.
    pub fn force_destroy_entity(&mut self, entity: Entity) -> bool {
        self.protected.remove(&entity);
        self.despawn(entity)
    }

    fn despawn(&mut self, entity: Entity) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        let Self {
            stores,
            spatial,
            zindex,
            ..
        } = self;
        // Leave the cell while the components still decide the rank of the
        // remaining occupants.
        spatial.remove(entity, |e| zindex.rank(stores, e));
        stores.remove_entity(entity);
        true
    }

    /// Checks if `entity` was created and not yet destroyed.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(&entity)
    }

    /// Shields `entity` from [`World::destroy_entity`].
    ///
    /// Returns `false` if the entity is not alive.
    pub fn protect(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.protected.insert(entity);
        true
    }

    /// Lifts protection from `entity`.
    pub fn unprotect(&mut self, entity: Entity) -> bool {
        self.protected.remove(&entity)
    }

    /// Checks if `entity` is protected.
    #[inline]
    #[must_use]
    pub fn is_protected(&self, entity: Entity) -> bool {
        self.protected.contains(&entity)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    /// Live entities in id order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let mut out: Vec<Entity> = self.alive.iter().copied().collect();
        out.sort_unstable();
        out
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Adds or replaces the `T` component of `entity`.
    ///
    /// Returns the replaced value. Dead entities are ignored. A positioned
    /// entity has its cell re-resolved, since its rank may have changed.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Option<T> {
        if !self.is_alive(entity) {
            tracing::debug!(%entity, kind = T::kind_name(), "insert on dead entity ignored");
            return None;
        }
        let old = self.stores.get_or_register::<T>().add(entity, value);
        self.refresh_cell_of(entity);
        old
    }

    /// Gets the `T` component of `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.stores.get::<T>().and_then(|s| s.get(entity))
    }

    /// Gets the `T` component of `entity` mutably.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.stores.get_mut::<T>().and_then(|s| s.get_mut(entity))
    }

    /// Checks if `entity` has a `T` component.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.stores.get::<T>().is_some_and(|s| s.has(entity))
    }

    /// Removes the `T` component of `entity`. No-op when absent.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let old = self.stores.get_mut::<T>()?.remove(entity)?;
        self.refresh_cell_of(entity);
        Some(old)
    }

    /// Store of `T`, if any entity ever held one.
    #[must_use]
    pub fn store<T: Component>(&self) -> Option<&Store<T>> {
        self.stores.get::<T>()
    }

    /// Store of `T`, registered on first use.
    ///
    /// Adding or removing entries here bypasses rank refresh; call
    /// [`World::refresh_ranks`] afterwards if a ranked kind changed.
    pub fn store_mut<T: Component>(&mut self) -> &mut Store<T> {
        self.stores.get_or_register::<T>()
    }

    /// Names of the component kinds `entity` carries.
    #[must_use]
    pub fn kinds_of(&self, entity: Entity) -> Vec<&'static str> {
        self.stores.kinds_of(entity)
    }

    // =========================================================================
    // Spatial
    // =========================================================================

    /// Places `entity` at `(x, y)`.
    ///
    /// Returns `false` for dead entities.
    pub fn set_position(&mut self, entity: Entity, x: i32, y: i32) -> bool {
        if !self.is_alive(entity) {
            tracing::debug!(%entity, x, y, "refused to position dead entity");
            return false;
        }
        let Self {
            stores,
            spatial,
            zindex,
            ..
        } = self;
        spatial.set(entity, Point::new(x, y), |e| zindex.rank(stores, e));
        true
    }

    /// Takes `entity` out of the spatial index. Returns where it was.
    pub fn remove_position(&mut self, entity: Entity) -> Option<Point> {
        let Self {
            stores,
            spatial,
            zindex,
            ..
        } = self;
        spatial.remove(entity, |e| zindex.rank(stores, e))
    }

    /// Current position of `entity`.
    #[must_use]
    pub fn position_of(&self, entity: Entity) -> Option<Point> {
        self.spatial.position_of(entity)
    }

    /// Every entity at `(x, y)` in arrival order.
    #[must_use]
    pub fn entities_at(&self, x: i32, y: i32) -> &[Entity] {
        self.spatial.entities_at(Point::new(x, y))
    }

    /// Highest-ranked entity at `(x, y)`, ties to the lowest id.
    #[must_use]
    pub fn top_entity_at(&self, x: i32, y: i32) -> Option<Entity> {
        self.spatial.top_at(Point::new(x, y))
    }

    /// Highest-ranked entity at `(x, y)` satisfying `predicate`.
    ///
    /// The predicate sees the world, so it can test components:
    ///
    /// ```rust,ignore
    /// world.top_entity_at_filtered(x, y, |w, e| w.is_interactable(e));
    /// ```
    pub fn top_entity_at_filtered<P>(&self, x: i32, y: i32, mut predicate: P) -> Option<Entity>
    where
        P: FnMut(&World, Entity) -> bool,
    {
        self.spatial.top_at_filtered(
            Point::new(x, y),
            |e| predicate(self, e),
            |e| self.zindex.rank(&self.stores, e),
        )
    }

    /// Rank of `entity` under the current z-index.
    #[must_use]
    pub fn rank_of(&self, entity: Entity) -> i32 {
        self.zindex.rank(&self.stores, entity)
    }

    /// Checks if `entity` carries an interactable kind.
    #[must_use]
    pub fn is_interactable(&self, entity: Entity) -> bool {
        self.zindex.is_interactable(&self.stores, entity)
    }

    /// Replaces the z-index resolver and re-resolves every cell.
    pub fn set_z_index(&mut self, zindex: ZIndex) {
        self.zindex = zindex;
        self.refresh_ranks();
    }

    /// Current z-index resolver.
    #[must_use]
    pub fn z_index(&self) -> &ZIndex {
        &self.zindex
    }

    /// Re-resolves the top occupant of every cell.
    pub fn refresh_ranks(&mut self) {
        let Self {
            stores,
            spatial,
            zindex,
            ..
        } = self;
        spatial.refresh_all(|e| zindex.rank(stores, e));
    }

    fn refresh_cell_of(&mut self, entity: Entity) {
        let Self {
            stores,
            spatial,
            zindex,
            ..
        } = self;
        if let Some(point) = spatial.position_of(entity) {
            spatial.refresh(point, |e| zindex.rank(stores, e));
        }
    }

    /// Read-only view of the spatial index.
    #[must_use]
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers `system` at `priority` (lower runs first).
    ///
    /// Callable from inside a running system; the new system first runs on
    /// the next tick.
    pub fn add_system<S: System + 'static>(&mut self, system: S, priority: i32) {
        self.schedule.add(Box::new(system), priority);
    }

    /// Number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.schedule.len()
    }

    /// Runs one tick of simulated length `delta`.
    pub fn run_tick(&mut self, delta: Duration) {
        let dispatched = self.events.dispatch();

        let clock = self
            .resources
            .get::<TickClock>()
            .copied()
            .unwrap_or_default()
            .advance(delta);
        self.resources.insert(clock);
        tracing::trace!(tick = clock.tick, dispatched, "tick");

        let mut schedule = std::mem::take(&mut self.schedule);
        schedule.run(self, delta);
        let added = std::mem::replace(&mut self.schedule, schedule);
        self.schedule.absorb(added);
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.resources.get::<TickClock>().map_or(0, |c| c.tick)
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Inserts `value`, returning the instance it replaced.
    pub fn insert_resource<R: Send + Sync + 'static>(&mut self, value: R) -> Option<R> {
        self.resources.insert(value)
    }

    /// Gets the `R` resource.
    #[must_use]
    pub fn resource<R: Send + Sync + 'static>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    /// Gets the `R` resource mutably.
    pub fn resource_mut<R: Send + Sync + 'static>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>()
    }

    /// Removes the `R` resource.
    pub fn remove_resource<R: Send + Sync + 'static>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    /// Checks if an `R` resource exists.
    #[must_use]
    pub fn has_resource<R: Send + Sync + 'static>(&self) -> bool {
        self.resources.contains::<R>()
    }

    /// Gets the `R` resource or fails with [`CoreError::MissingResource`].
    pub fn require_resource<R: Send + Sync + 'static>(&self) -> CoreResult<&R> {
        self.resources
            .get::<R>()
            .ok_or(CoreError::MissingResource(type_name::<R>()))
    }

    /// Shared holder for singleton kind `K`, created on first use.
    ///
    /// Clone the `Arc` into other threads; the holder itself is the only
    /// world state they may touch directly.
    pub fn singleton<K: 'static>(&mut self) -> Arc<SingletonHolder<K>> {
        Arc::clone(
            self.resources
                .get_or_insert_with(|| Arc::new(SingletonHolder::<K>::new())),
        )
    }

    /// The event router shared with producers.
    #[must_use]
    pub fn events(&self) -> &Arc<EventRouter> {
        &self.events
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Cursor;
    impl Component for Cursor {}

    #[derive(Clone, Debug, PartialEq)]
    struct Nugget;
    impl Component for Nugget {}

    #[derive(Clone, Debug, PartialEq)]
    struct Glyph(char);
    impl Component for Glyph {}

    fn world() -> World {
        let mut world = World::new();
        world.set_z_index(
            ZIndex::builder()
                .layer::<Cursor>(1000)
                .layer::<Nugget>(500)
                .interactable::<Nugget>()
                .build(),
        );
        world
    }

    #[test]
    fn test_destroy_removes_everywhere() {
        let mut world = world();
        let e = world.create_entity();
        world.insert(e, Glyph('*'));
        world.insert(e, Nugget);
        world.set_position(e, 1, 1);

        assert!(world.destroy_entity(e));
        assert!(!world.is_alive(e));
        assert!(!world.has::<Glyph>(e));
        assert!(!world.has::<Nugget>(e));
        assert_eq!(world.position_of(e), None);
        assert!(world.entities_at(1, 1).is_empty());
        assert!(world.kinds_of(e).is_empty());

        assert!(!world.destroy_entity(e));
        assert!(!world.destroy_entity(Entity::from_raw(999)));
    }

    #[test]
    fn test_protected_survives_until_forced() {
        let mut world = world();
        let cursor = world.create_entity();
        world.insert(cursor, Cursor);
        assert!(world.protect(cursor));

        assert!(!world.destroy_entity(cursor));
        assert!(world.has::<Cursor>(cursor));

        assert!(world.force_destroy_entity(cursor));
        assert!(!world.is_protected(cursor));
        assert!(!world.is_alive(cursor));
    }

    #[test]
    fn test_unprotect_allows_destroy() {
        let mut world = world();
        let cursor = world.create_entity();
        world.insert(cursor, Cursor);
        world.protect(cursor);

        assert!(world.unprotect(cursor));
        assert!(!world.unprotect(cursor));
        assert!(!world.is_protected(cursor));
        assert!(world.destroy_entity(cursor));
        assert!(!world.is_alive(cursor));
    }

    #[test]
    fn test_dead_entities_refused() {
        let mut world = world();
        let e = world.create_entity();
        world.destroy_entity(e);

        assert!(!world.set_position(e, 0, 0));
        assert_eq!(world.insert(e, Glyph('x')), None);
        assert!(!world.has::<Glyph>(e));
        assert!(!world.protect(e));
    }

    #[test]
    fn test_component_change_re_resolves_cell() {
        let mut world = world();
        let a = world.create_entity();
        let b = world.create_entity();
        world.set_position(a, 2, 2);
        world.set_position(b, 2, 2);
        assert_eq!(world.top_entity_at(2, 2), Some(a));

        world.insert(b, Nugget);
        assert_eq!(world.top_entity_at(2, 2), Some(b));

        world.remove_component::<Nugget>(b);
        assert_eq!(world.top_entity_at(2, 2), Some(a));
    }

    #[test]
    fn test_filtered_top_uses_interactability() {
        let mut world = world();
        let cursor = world.create_entity();
        let nugget = world.create_entity();
        world.insert(cursor, Cursor);
        world.insert(nugget, Nugget);
        world.set_position(nugget, 5, 5);
        world.set_position(cursor, 5, 5);

        assert_eq!(world.top_entity_at(5, 5), Some(cursor));
        assert_eq!(
            world.top_entity_at_filtered(5, 5, |w, e| w.is_interactable(e)),
            Some(nugget)
        );
    }

    #[test]
    fn test_systems_run_in_priority_order_with_clock() {
        #[derive(Default)]
        struct Log(Vec<&'static str>);

        let mut world = world();
        world.insert_resource(Log::default());
        world.add_system(
            |w: &mut World, _: Duration| {
                if let Some(log) = w.resource_mut::<Log>() {
                    log.0.push("late");
                }
            },
            10,
        );
        world.add_system(
            |w: &mut World, _: Duration| {
                if let Some(log) = w.resource_mut::<Log>() {
                    log.0.push("early");
                }
            },
            -1,
        );

        world.run_tick(Duration::from_millis(50));
        world.run_tick(Duration::from_millis(50));

        assert_eq!(
            world.resource::<Log>().map(|l| l.0.clone()),
            Some(vec!["early", "late", "early", "late"])
        );
        let clock = world.require_resource::<TickClock>().unwrap();
        assert_eq!(clock.tick, 2);
        assert_eq!(clock.elapsed, Duration::from_millis(100));
        assert_eq!(world.tick_count(), 2);
    }

    #[test]
    fn test_system_added_during_tick_is_kept() {
        let mut world = world();
        let mut spawned = false;
        world.add_system(
            move |w: &mut World, _: Duration| {
                if !spawned {
                    spawned = true;
                    w.add_system(|_: &mut World, _: Duration| {}, 0);
                }
            },
            0,
        );

        world.run_tick(Duration::ZERO);
        assert_eq!(world.system_count(), 2);
        world.run_tick(Duration::ZERO);
        assert_eq!(world.system_count(), 2);
    }

    #[test]
    fn test_remove_resource() {
        let mut world = World::new();
        world.insert_resource(Glyph('r'));
        assert!(world.has_resource::<Glyph>());

        assert_eq!(world.remove_resource::<Glyph>(), Some(Glyph('r')));
        assert!(!world.has_resource::<Glyph>());
        assert_eq!(world.remove_resource::<Glyph>(), None);
        assert!(world.require_resource::<Glyph>().is_err());
    }

    #[test]
    fn test_require_missing_resource() {
        let world = World::new();
        let err = world.require_resource::<Glyph>().unwrap_err();
        assert!(matches!(err, CoreError::MissingResource(_)));
    }

    #[test]
    fn test_singleton_holder_is_shared() {
        struct Active;
        let mut world = World::new();
        let a = world.singleton::<Active>();
        let b = world.singleton::<Active>();
        let e = world.create_entity();

        assert!(a.set_if_absent(e));
        assert_eq!(b.current(), Some(e));
    }
}
