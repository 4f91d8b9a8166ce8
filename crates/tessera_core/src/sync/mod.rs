//! # Cross-Thread Primitives
//!
//! The world is owned by the simulation thread. Other threads get exactly
//! two ways in besides the event router:
//!
//! ```text
//! Thread 1 (simulation):    mutates world, captures snapshots
//! Thread 2 (input/timers):  publishes events, may clear singleton holders
//! Thread 3 (presentation):  reads the latest snapshot
//! ```
//!
//! - [`SingletonHolder`]: one atomic word per singleton kind, cleared by CAS
//! - [`SnapshotSlot`]: deep copy per tick, swapped under a brief lock

mod holder;
mod snapshot;

pub use holder::SingletonHolder;
pub use snapshot::{CellView, OccupancySnapshot, Snapshot, SnapshotReader, SnapshotSlot};
