//! # Systems
//!
//! Systems hold the simulation logic. They run one after another on the
//! simulation thread, in ascending priority order, once per tick.

use std::time::Duration;

use super::world::World;

/// Logic that runs once per tick against the world.
pub trait System: Send {
    /// Advances this system by one tick.
    ///
    /// `delta` is the simulated time since the previous tick.
    fn update(&mut self, world: &mut World, delta: Duration);

    /// Name of this system for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> System for F
where
    F: FnMut(&mut World, Duration) + Send,
{
    fn update(&mut self, world: &mut World, delta: Duration) {
        self(world, delta);
    }
}

struct ScheduledSystem {
    priority: i32,
    seq: u64,
    system: Box<dyn System>,
}

/// Systems sorted by `(priority, registration order)`.
#[derive(Default)]
pub struct Schedule {
    systems: Vec<ScheduledSystem>,
    next_seq: u64,
}

impl Schedule {
    /// Creates an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `system` at `priority`. Lower priorities run first; equal
    /// priorities run in registration order.
    pub fn add(&mut self, system: Box<dyn System>, priority: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let at = self
            .systems
            .partition_point(|s| (s.priority, s.seq) <= (priority, seq));
        self.systems.insert(
            at,
            ScheduledSystem {
                priority,
                seq,
                system,
            },
        );
    }

    /// Moves every system of `other` into this schedule, keeping order.
    ///
    /// Systems registered while a tick was running land here.
    pub fn absorb(&mut self, other: Schedule) {
        for entry in other.systems {
            self.add(entry.system, entry.priority);
        }
    }

    /// Runs every system once, in order.
    pub fn run(&mut self, world: &mut World, delta: Duration) {
        for entry in &mut self.systems {
            tracing::trace!(system = entry.system.name(), priority = entry.priority, "update");
            entry.system.update(world, delta);
        }
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no systems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// System names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.systems
            .iter()
            .map(|s| s.system.name().to_owned())
            .collect()
    }
}
