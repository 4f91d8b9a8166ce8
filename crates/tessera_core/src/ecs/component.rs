//! # Component System
//!
//! Components are pure data containers with no behavior.
//! The core never interprets them; systems give them meaning.

use std::any::type_name;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Clone`: snapshots copy them out of the live world
/// - `Send + Sync`: snapshots cross to the presentation thread
/// - `'static`: stores are keyed by `TypeId`
///
/// # Example
///
/// ```rust
/// use tessera_core::Component;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Glyph {
///     ch: char,
/// }
///
/// impl Component for Glyph {}
/// ```
pub trait Component: Clone + Send + Sync + 'static {
    /// Human-readable name of the component kind, used in logs.
    #[inline]
    fn kind_name() -> &'static str {
        type_name::<Self>()
    }
}
