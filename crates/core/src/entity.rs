//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// `ENTITY_TYPE` is the stable name used when an entity shows up in logs and
/// deletion errors (e.g. `"account"`).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    const ENTITY_TYPE: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
