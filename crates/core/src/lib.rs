//! `gatehouse-core` — identifiers and domain primitives shared by every layer.
//!
//! This crate contains no storage or transport concerns.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, RecordId, RoleLinkId};
pub use value_object::ValueObject;
