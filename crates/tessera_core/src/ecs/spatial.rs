//! # Spatial Index
//!
//! Maps discrete grid coordinates to occupancy [`Cell`]s.
//!
//! ## Design
//!
//! - An entity occupies at most one cell (its current position)
//! - Every cell caches its top occupant, recomputed on each mutation
//! - Empty cells are pruned, so queries on untouched coordinates cost one
//!   hash lookup and never fail
//!
//! Ranks are supplied by the caller as a closure. The index knows nothing
//! about components; the world wires in its [`ZIndex`](super::ZIndex).

use std::collections::HashMap;
use std::fmt;

use super::entity::Entity;
use super::zindex::select_top;

/// A discrete grid coordinate.
///
/// Ordered row-major (`y` first, then `x`).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point {
    /// Creates a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Occupancy record for one coordinate.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    /// Occupants in arrival order.
    occupants: Vec<Entity>,
    /// Cached top occupant and its rank as of the last mutation.
    top: Option<(Entity, i32)>,
}

impl Cell {
    /// Occupants in arrival order.
    #[inline]
    #[must_use]
    pub fn occupants(&self) -> &[Entity] {
        &self.occupants
    }

    /// Cached top occupant.
    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<Entity> {
        self.top.map(|(e, _)| e)
    }

    /// Rank of the cached top occupant.
    #[inline]
    #[must_use]
    pub fn top_rank(&self) -> Option<i32> {
        self.top.map(|(_, r)| r)
    }

    /// Returns `true` if nobody is here.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    fn recompute<F: FnMut(Entity) -> i32>(&mut self, rank: F) {
        self.top = select_top(self.occupants.iter().copied(), rank);
    }
}

/// Coordinate-keyed occupancy index.
#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    cells: HashMap<Point, Cell>,
    positions: HashMap<Entity, Point>,
}

impl SpatialIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index sized for `capacity` positioned entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: HashMap::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Places `entity` at `point`, leaving its previous cell.
    ///
    /// Both cells get their top occupant recomputed. Setting an entity to
    /// the point it already occupies leaves the structure untouched.
    pub fn set<F: FnMut(Entity) -> i32>(&mut self, entity: Entity, point: Point, mut rank: F) {
        if let Some(old) = self.positions.get(&entity).copied() {
            if old == point {
                return;
            }
            self.detach(entity, old, &mut rank);
        }

        let cell = self.cells.entry(point).or_default();
        cell.occupants.push(entity);
        cell.recompute(&mut rank);
        self.positions.insert(entity, point);
    }

    /// Removes `entity` from the index. No-op if it was not positioned.
    ///
    /// Returns the point it occupied.
    pub fn remove<F: FnMut(Entity) -> i32>(&mut self, entity: Entity, mut rank: F) -> Option<Point> {
        let point = self.positions.remove(&entity)?;
        self.detach(entity, point, &mut rank);
        Some(point)
    }

    fn detach<F: FnMut(Entity) -> i32>(&mut self, entity: Entity, point: Point, rank: &mut F) {
        let Some(cell) = self.cells.get_mut(&point) else {
            return;
        };
        cell.occupants.retain(|e| *e != entity);
        if cell.is_empty() {
            self.cells.remove(&point);
        } else {
            cell.recompute(rank);
        }
    }

    /// Current point of `entity`.
    #[inline]
    #[must_use]
    pub fn position_of(&self, entity: Entity) -> Option<Point> {
        self.positions.get(&entity).copied()
    }

    /// Checks if `entity` is positioned.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.positions.contains_key(&entity)
    }

    /// Cell at `point`, if anyone is there.
    #[inline]
    #[must_use]
    pub fn cell(&self, point: Point) -> Option<&Cell> {
        self.cells.get(&point)
    }

    /// Every occupant at `point`, in arrival order. Empty if unoccupied.
    #[inline]
    #[must_use]
    pub fn entities_at(&self, point: Point) -> &[Entity] {
        match self.cells.get(&point) {
            Some(cell) => cell.occupants(),
            None => &[],
        }
    }

    /// Cached top occupant at `point`.
    #[inline]
    #[must_use]
    pub fn top_at(&self, point: Point) -> Option<Entity> {
        self.cells.get(&point).and_then(Cell::top)
    }

    /// Rank of the cached top occupant at `point`.
    #[inline]
    #[must_use]
    pub fn top_rank_at(&self, point: Point) -> Option<i32> {
        self.cells.get(&point).and_then(Cell::top_rank)
    }

    /// Highest-ranked occupant at `point` satisfying `predicate`.
    ///
    /// Evaluated fresh over every occupant; the cached top answers a
    /// different question and is not consulted.
    pub fn top_at_filtered<P, F>(&self, point: Point, mut predicate: P, rank: F) -> Option<Entity>
    where
        P: FnMut(Entity) -> bool,
        F: FnMut(Entity) -> i32,
    {
        let cell = self.cells.get(&point)?;
        let matching = cell.occupants.iter().copied().filter(|e| predicate(*e));
        select_top(matching, rank).map(|(e, _)| e)
    }

    /// Recomputes the cached top at `point`.
    ///
    /// Needed when an occupant's rank changed without it moving.
    pub fn refresh<F: FnMut(Entity) -> i32>(&mut self, point: Point, rank: F) {
        if let Some(cell) = self.cells.get_mut(&point) {
            cell.recompute(rank);
        }
    }

    /// Recomputes the cached top of every cell.
    pub fn refresh_all<F: FnMut(Entity) -> i32>(&mut self, mut rank: F) {
        for cell in self.cells.values_mut() {
            cell.recompute(&mut rank);
        }
    }

    /// Number of occupied cells.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of positioned entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.positions.len()
    }

    /// Iterates over occupied cells. Order is unspecified.
    pub fn iter_cells(&self) -> impl Iterator<Item = (Point, &Cell)> {
        self.cells.iter().map(|(p, c)| (*p, c))
    }
}
