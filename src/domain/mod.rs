//! Domain layer: records, invariants and validators.

pub mod entities;
pub mod error;
pub mod posts;
pub mod relations;
pub mod slug;
pub mod validators;
