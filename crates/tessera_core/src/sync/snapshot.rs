//! # Frame-Coherent Snapshots
//!
//! The presentation side never reads the live world. Once per tick the
//! simulation captures a fully owned copy and publishes it:
//!
//! ```text
//! simulation:    [tick N] capture ──lock/swap/unlock──> [tick N+1] ...
//!                                        │
//! presentation:          latest() ──> Arc<S> ──> read at leisure
//! ```
//!
//! The lock only covers swapping an `Arc`, so neither side waits on the
//! other for longer than a pointer store. A snapshot owns all its data;
//! later mutation of the world cannot change what a reader holds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ecs::{Entity, Point, World};

/// State the presentation side needs, captured by deep copy.
pub trait Snapshot: Send + Sync + 'static {
    /// Copies what is needed out of `world`.
    ///
    /// The result must not borrow or share storage with the world.
    fn capture(world: &World) -> Self;
}

struct Published<S> {
    generation: u64,
    snapshot: Option<Arc<S>>,
}

/// Single-slot mailbox holding the latest snapshot.
pub struct SnapshotSlot<S> {
    published: Mutex<Published<S>>,
    /// Mirror of `published.generation` for lock-free polling.
    generation: AtomicU64,
}

impl<S: Snapshot> SnapshotSlot<S> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Published {
                generation: 0,
                snapshot: None,
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// Publishes `snapshot`, replacing the previous one.
    ///
    /// Returns the new generation number (first publish is `1`).
    pub fn publish(&self, snapshot: S) -> u64 {
        let snapshot = Arc::new(snapshot);
        let mut published = self.published.lock();
        published.generation += 1;
        published.snapshot = Some(snapshot);
        self.generation.store(published.generation, Ordering::Release);
        published.generation
    }

    /// Captures `S` from `world` and publishes it.
    ///
    /// The copy is taken before the lock is acquired.
    pub fn capture_from(&self, world: &World) -> u64 {
        self.publish(S::capture(world))
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<S>> {
        self.published.lock().snapshot.clone()
    }

    /// Number of snapshots published so far.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Reader that only yields snapshots it has not seen yet.
    #[must_use]
    pub fn reader(self: &Arc<Self>) -> SnapshotReader<S> {
        SnapshotReader {
            slot: Arc::clone(self),
            seen: 0,
        }
    }
}

impl<S: Snapshot> Default for SnapshotSlot<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Presentation-side handle on a [`SnapshotSlot`].
pub struct SnapshotReader<S> {
    slot: Arc<SnapshotSlot<S>>,
    seen: u64,
}

impl<S: Snapshot> SnapshotReader<S> {
    /// Returns the latest snapshot if one was published since the last
    /// successful poll.
    pub fn poll(&mut self) -> Option<Arc<S>> {
        if self.slot.generation() <= self.seen {
            return None;
        }
        let published = self.slot.published.lock();
        self.seen = published.generation;
        published.snapshot.clone()
    }

    /// Latest snapshot regardless of whether it was seen.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<S>> {
        self.slot.latest()
    }

    /// Generation of the last snapshot returned by [`SnapshotReader::poll`].
    #[must_use]
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl<S> Clone for SnapshotReader<S> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            seen: self.seen,
        }
    }
}

/// Owned copy of one occupied cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellView {
    /// Coordinate.
    pub point: Point,
    /// Top occupant at capture time.
    pub top: Option<Entity>,
    /// Rank of the top occupant.
    pub top_rank: Option<i32>,
    /// Every occupant in arrival order.
    pub occupants: Vec<Entity>,
}

/// Occupancy of every cell at the end of a tick, ordered row-major.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccupancySnapshot {
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Occupied cells sorted by point.
    pub cells: Vec<CellView>,
}

impl OccupancySnapshot {
    /// Cell at `point`, if occupied at capture time.
    #[must_use]
    pub fn cell(&self, point: Point) -> Option<&CellView> {
        self.cells
            .binary_search_by(|c| c.point.cmp(&point))
            .ok()
            .map(|i| &self.cells[i])
    }

    /// Top occupant at `point` at capture time.
    #[must_use]
    pub fn top_at(&self, point: Point) -> Option<Entity> {
        self.cell(point).and_then(|c| c.top)
    }

    /// Total positioned entities at capture time.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.cells.iter().map(|c| c.occupants.len()).sum()
    }
}

impl Snapshot for OccupancySnapshot {
    fn capture(world: &World) -> Self {
        let mut cells: Vec<CellView> = world
            .spatial()
            .iter_cells()
            .map(|(point, cell)| CellView {
                point,
                top: cell.top(),
                top_rank: cell.top_rank(),
                occupants: cell.occupants().to_vec(),
            })
            .collect();
        cells.sort_unstable_by_key(|c| c.point);
        Self {
            tick: world.tick_count(),
            cells,
        }
    }
}
