//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attributes. Types such as
/// the anti-forgery token pair expose accessors only; "changing" one means
/// issuing a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
