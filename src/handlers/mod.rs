//! HTTP handlers for entity CRUD and library relations.

pub mod entity;
pub mod library;
pub use entity::*;
