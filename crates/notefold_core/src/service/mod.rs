//! Store use-case services.
//!
//! # Responsibility
//! - Apply folder/file mutations and persist after each change.
//! - Provide pure read projections for presentation layers.

pub mod folder_store;
pub mod projection;
