//! Domain layer types and invariants.

pub mod blob;
pub mod entities;
pub mod error;
