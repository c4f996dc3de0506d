//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Payments and enrollments are entities owned by a larger consistency
/// boundary; they keep their identity while being replaced wholesale on each
/// state change.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
