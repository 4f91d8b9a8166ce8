//! # Entity Component System
//!
//! Type-erased component stores on top of a grid spatial index.
//!
//! ## Design Principles
//!
//! 1. **Entities are bare ids** - all data lives in per-kind stores
//! 2. **One owner** - the [`World`] is mutated only by the simulation thread
//! 3. **Explicit world** - systems receive `&mut World`, nothing is ambient
//! 4. **One representative per cell** - z-index ranks resolve stacked occupants

pub mod component;
pub mod entity;
pub mod resource;
pub mod spatial;
pub mod storage;
pub mod system;
pub mod world;
pub mod zindex;

pub use component::Component;
pub use entity::{Entity, EntityAllocator};
pub use resource::{Resources, TickClock};
pub use spatial::{Cell, Point, SpatialIndex};
pub use storage::{AnyStore, Store, Stores};
pub use system::{Schedule, System};
pub use world::World;
pub use zindex::{select_top, ZIndex, ZIndexBuilder, DEFAULT_RANK};
