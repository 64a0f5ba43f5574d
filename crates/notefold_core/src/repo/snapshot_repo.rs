//! Snapshot persistence adapter.
//!
//! # Responsibility
//! - Durably save and restore the store's persisted collections.
//! - Expose a pure key -> serialized value contract with no business logic.
//!
//! # Invariants
//! - Only `folders`, `favoriteFiles` and `archivedFiles` are persisted.
//! - One save writes all three keys atomically.
//! - Loading never fails because of data shape: malformed or missing keys
//!   come back as `None`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::item::{File, Folder};
use log::{error, warn};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by snapshot repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from snapshot repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// A collection could not be encoded.
    Serialize(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "snapshot repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "snapshot repository requires table `{table}`")
            }
            Self::Serialize(err) => write!(f, "failed to encode snapshot: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::UninitializedConnection { .. } | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Keys of the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotKey {
    Folders,
    FavoriteFiles,
    ArchivedFiles,
}

impl SnapshotKey {
    pub const ALL: [SnapshotKey; 3] = [Self::Folders, Self::FavoriteFiles, Self::ArchivedFiles];

    /// Stored key text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folders => "folders",
            Self::FavoriteFiles => "favoriteFiles",
            Self::ArchivedFiles => "archivedFiles",
        }
    }
}

impl Display for SnapshotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key -> serialized value storage contract.
pub trait SnapshotRepository {
    /// Reads one serialized entry.
    fn read_entry(&self, key: SnapshotKey) -> RepoResult<Option<String>>;
    /// Writes all given entries in one atomic step.
    fn write_entries(&self, entries: &[(SnapshotKey, String)]) -> RepoResult<()>;
}

impl<T: SnapshotRepository + ?Sized> SnapshotRepository for &T {
    fn read_entry(&self, key: SnapshotKey) -> RepoResult<Option<String>> {
        (**self).read_entry(key)
    }

    fn write_entries(&self, entries: &[(SnapshotKey, String)]) -> RepoResult<()> {
        (**self).write_entries(entries)
    }
}

/// Borrowed view of everything that is persisted.
#[derive(Debug, Clone)]
pub struct StoreSnapshot<'a> {
    pub folders: &'a [Folder],
    /// Favorite records resolved at save time.
    pub favorite_files: Vec<&'a File>,
    pub archived_files: &'a [File],
}

/// Decoded persisted collections. `None` means missing or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSnapshot {
    pub folders: Option<Vec<Folder>>,
    pub favorite_files: Option<Vec<File>>,
    pub archived_files: Option<Vec<File>>,
}

/// Encodes and writes the three persisted collections.
pub fn save_snapshot<R: SnapshotRepository + ?Sized>(
    repo: &R,
    snapshot: &StoreSnapshot<'_>,
) -> RepoResult<()> {
    let entries = [
        (SnapshotKey::Folders, serde_json::to_string(snapshot.folders)?),
        (
            SnapshotKey::FavoriteFiles,
            serde_json::to_string(&snapshot.favorite_files)?,
        ),
        (
            SnapshotKey::ArchivedFiles,
            serde_json::to_string(snapshot.archived_files)?,
        ),
    ];
    repo.write_entries(&entries)
}

/// Reads and decodes every persisted collection independently.
pub fn load_snapshot<R: SnapshotRepository + ?Sized>(repo: &R) -> LoadedSnapshot {
    LoadedSnapshot {
        folders: load_entry(repo, SnapshotKey::Folders),
        favorite_files: load_entry(repo, SnapshotKey::FavoriteFiles),
        archived_files: load_entry(repo, SnapshotKey::ArchivedFiles),
    }
}

fn load_entry<T, R>(repo: &R, key: SnapshotKey) -> Option<T>
where
    T: DeserializeOwned,
    R: SnapshotRepository + ?Sized,
{
    let raw = match repo.read_entry(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            error!(
                "event=snapshot_load module=repo status=error key={} error_code=read_failed error={}",
                key, err
            );
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                "event=snapshot_load module=repo status=degraded key={} error_code=malformed_entry error={}",
                key, err
            );
            None
        }
    }
}

/// SQLite-backed snapshot repository.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_snapshot_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn read_entry(&self, key: SnapshotKey) -> RepoResult<Option<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_value
             FROM snapshot_entries
             WHERE entry_key = ?1;",
        )?;
        let mut rows = stmt.query([key.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }
        Ok(None)
    }

    fn write_entries(&self, entries: &[(SnapshotKey, String)]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO snapshot_entries (entry_key, entry_value, updated_at)
                 VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
                 ON CONFLICT(entry_key) DO UPDATE
                 SET entry_value = excluded.entry_value,
                     updated_at = excluded.updated_at;",
                params![key.as_str(), value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn ensure_snapshot_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'snapshot_entries'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("snapshot_entries"));
    }
    Ok(())
}

/// In-memory snapshot repository for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySnapshotRepository {
    entries: RefCell<BTreeMap<SnapshotKey, String>>,
    writes: Cell<usize>,
}

impl MemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one raw entry, bypassing encoding.
    pub fn with_entry(self, key: SnapshotKey, raw: impl Into<String>) -> Self {
        self.entries.borrow_mut().insert(key, raw.into());
        self
    }

    /// Number of successful `write_entries` calls.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl SnapshotRepository for MemorySnapshotRepository {
    fn read_entry(&self, key: SnapshotKey) -> RepoResult<Option<String>> {
        Ok(self.entries.borrow().get(&key).cloned())
    }

    fn write_entries(&self, entries: &[(SnapshotKey, String)]) -> RepoResult<()> {
        let mut stored = self.entries.borrow_mut();
        for (key, value) in entries {
            stored.insert(*key, value.clone());
        }
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
