//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: to "modify" one,
/// build a new one. [`crate::Money`] and [`crate::Contact`] are the shared
/// examples; domain crates mark their own (e.g. student identity documents).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
