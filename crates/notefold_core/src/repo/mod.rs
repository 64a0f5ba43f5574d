//! Persistence adapter layer.
//!
//! # Responsibility
//! - Define the key -> serialized value contract the store persists through.
//! - Isolate SQLite details from store orchestration.

pub mod snapshot_repo;
