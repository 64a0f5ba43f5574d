//! Folder/file domain model.
//!
//! # Responsibility
//! - Define the records the store owns and the aggregate state shape.
//! - Keep ordering and uniqueness helpers next to the data they guard.
//!
//! # Invariants
//! - A file lives in exactly one folder or in the archive.
//! - Favorites reference files by id and never own them.

pub mod item;
pub mod order;
pub mod state;
