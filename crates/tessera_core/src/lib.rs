//! # TESSERA Core
//!
//! Tick-driven entity substrate for grid simulations:
//! - Entities with type-erased component stores
//! - Spatial index resolving stacked occupants by z-index
//! - Multi-producer event router with bounded, non-blocking queues
//! - Singleton CAS holders and frame-coherent snapshots for other threads
//!
//! ## Threading Rules
//!
//! 1. **One writer** - only the simulation thread mutates the [`World`]
//! 2. **Producers publish** - other threads affect the world through events
//! 3. **Readers copy** - presentation reads [`Snapshot`]s, never the world
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use tessera_core::{Component, World, ZIndex};
//!
//! #[derive(Clone)]
//! struct Nugget;
//! impl Component for Nugget {}
//!
//! let mut world = World::new();
//! world.set_z_index(ZIndex::builder().layer::<Nugget>(500).build());
//!
//! let nugget = world.create_entity();
//! world.insert(nugget, Nugget);
//! world.set_position(nugget, 3, 4);
//! world.run_tick(Duration::from_millis(16));
//!
//! assert_eq!(world.top_entity_at(3, 4), Some(nugget));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod sync;

pub use config::{CoreConfig, WorldConfig};
pub use ecs::{
    Cell, Component, Entity, Point, Schedule, SpatialIndex, Store, System, TickClock, World,
    ZIndex, ZIndexBuilder, DEFAULT_RANK,
};
pub use error::{CoreError, CoreResult};
pub use events::{ChannelConfig, ChannelStats, EventRouter, OverflowPolicy, Publisher, Subscription};
pub use sync::{CellView, OccupancySnapshot, SingletonHolder, Snapshot, SnapshotReader, SnapshotSlot};
