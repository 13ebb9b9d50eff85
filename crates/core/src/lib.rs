//! `fieldops-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, money and the entity trait.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{is_present, require_fields, DomainError, DomainResult};
pub use id::{ClientId, InterventionId, InventoryItemId, MaterialLineId, UserId};
pub use money::Money;
