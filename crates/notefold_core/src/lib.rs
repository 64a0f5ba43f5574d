//! Core domain logic for notefold.
//! This crate owns the folder/file store and its persistence adapter.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::item::{
    File, Folder, FolderSelection, ItemId, DEFAULT_FOLDER_ID, DEFAULT_FOLDER_NAME,
};
pub use model::state::StoreState;
pub use repo::snapshot_repo::{
    load_snapshot, save_snapshot, LoadedSnapshot, MemorySnapshotRepository, RepoError,
    RepoResult, SnapshotKey, SnapshotRepository, SqliteSnapshotRepository, StoreSnapshot,
};
pub use service::folder_store::{
    FolderStore, StoreError, StoreResult, StoreResultExt, UnarchiveOutcome,
};
pub use service::projection::{content_preview, displayed_files, resolve_selected_file};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
