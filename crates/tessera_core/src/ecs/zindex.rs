//! # Z-Index Resolution
//!
//! Ranks entities by the component kinds they carry, so that a cell holding
//! several occupants (a cursor standing on a collectible, say) resolves to a
//! single representative.
//!
//! ## Algorithm
//!
//! ```text
//! rules (descending rank):  Cursor=1000 → Nugget=500 → Character=100
//! entity carries {Nugget, Character}  →  500   (first match wins)
//! entity carries nothing ranked       →  default rank
//! ```
//!
//! Among candidates the maximum rank wins; ties go to the lowest entity id.

use std::any::TypeId;
use std::cmp::Reverse;

use super::component::Component;
use super::entity::Entity;
use super::storage::Stores;

/// Rank given to entities that carry no ranked component kind.
pub const DEFAULT_RANK: i32 = 0;

#[derive(Clone, Debug)]
struct ZRule {
    type_id: TypeId,
    kind: &'static str,
    rank: i32,
}

/// Component-kind based ranking and interactability.
///
/// # Example
///
/// ```rust,ignore
/// let z = ZIndex::builder()
///     .layer::<Cursor>(1000)
///     .layer::<Nugget>(500)
///     .interactable::<Nugget>()
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct ZIndex {
    /// Sorted by descending rank, registration order among equals.
    rules: Vec<ZRule>,
    default_rank: i32,
    interactable: Vec<TypeId>,
}

impl ZIndex {
    /// Starts a new resolver definition.
    #[must_use]
    pub fn builder() -> ZIndexBuilder {
        ZIndexBuilder::new()
    }

    /// Rank of `entity` given the stores it belongs to.
    #[must_use]
    pub fn rank(&self, stores: &Stores, entity: Entity) -> i32 {
        self.rules
            .iter()
            .find(|rule| stores.contains(rule.type_id, entity))
            .map_or(self.default_rank, |rule| rule.rank)
    }

    /// Checks whether `entity` carries any interactable component kind.
    ///
    /// Not a rank, and never cached.
    #[must_use]
    pub fn is_interactable(&self, stores: &Stores, entity: Entity) -> bool {
        self.interactable
            .iter()
            .any(|type_id| stores.contains(*type_id, entity))
    }

    /// Rank used when no rule matches.
    #[must_use]
    pub const fn default_rank(&self) -> i32 {
        self.default_rank
    }

    /// Ranked kinds in evaluation order, as `(name, rank)`.
    pub fn layers(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.rules.iter().map(|r| (r.kind, r.rank))
    }
}

impl Default for ZIndex {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ZIndex`].
#[derive(Debug)]
pub struct ZIndexBuilder {
    rules: Vec<ZRule>,
    default_rank: i32,
    interactable: Vec<TypeId>,
}

impl ZIndexBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_rank: DEFAULT_RANK,
            interactable: Vec::new(),
        }
    }

    /// Ranks entities carrying `C` at `rank`.
    ///
    /// Registering the same kind twice replaces the earlier rank.
    #[must_use]
    pub fn layer<C: Component>(mut self, rank: i32) -> Self {
        let type_id = TypeId::of::<C>();
        self.rules.retain(|r| r.type_id != type_id);
        self.rules.push(ZRule {
            type_id,
            kind: C::kind_name(),
            rank,
        });
        self
    }

    /// Marks `C` as an interactable kind.
    #[must_use]
    pub fn interactable<C: Component>(mut self) -> Self {
        let type_id = TypeId::of::<C>();
        if !self.interactable.contains(&type_id) {
            self.interactable.push(type_id);
        }
        self
    }

    /// Sets the rank for entities that match no layer.
    #[must_use]
    pub fn default_rank(mut self, rank: i32) -> Self {
        self.default_rank = rank;
        self
    }

    /// Finishes the resolver.
    #[must_use]
    pub fn build(mut self) -> ZIndex {
        // Stable sort keeps registration order among equal ranks.
        self.rules.sort_by_key(|r| Reverse(r.rank));
        ZIndex {
            rules: self.rules,
            default_rank: self.default_rank,
            interactable: self.interactable,
        }
    }
}

impl Default for ZIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the top candidate: maximum rank, lowest id among equal ranks.
///
/// Independent of the iteration order of `candidates`.
pub fn select_top<I, F>(candidates: I, mut rank: F) -> Option<(Entity, i32)>
where
    I: IntoIterator<Item = Entity>,
    F: FnMut(Entity) -> i32,
{
    candidates
        .into_iter()
        .map(|e| (e, rank(e)))
        .max_by_key(|&(e, r)| (r, Reverse(e)))
}
