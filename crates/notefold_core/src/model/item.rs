//! Folder/file domain records.
//!
//! # Responsibility
//! - Define the canonical folder and file records owned by the store.
//! - Keep the persisted JSON shape (`camelCase`, `originalFolderId`) stable.
//!
//! # Invariants
//! - `ItemId` is opaque; generated ids are never reused.
//! - `File::original_folder_id` is `Some` only while the file is archived.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Id of the folder every fresh store starts with.
pub const DEFAULT_FOLDER_ID: &str = "default-notes";
/// Display name of the folder every fresh store starts with.
pub const DEFAULT_FOLDER_NAME: &str = "Notes";

/// Stable identifier shared by folders and files.
///
/// Persisted data written by older builds used integer timestamp ids, so
/// deserialization accepts both JSON strings and integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawItemId", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Creates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrows the id text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<ItemId> for String {
    fn from(value: ItemId) -> Self {
        value.0
    }
}

impl PartialEq<str> for ItemId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ItemId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawItemId> for ItemId {
    fn from(value: RawItemId) -> Self {
        match value {
            RawItemId::Text(text) => Self(text),
            RawItemId::Signed(number) => Self(number.to_string()),
            RawItemId::Unsigned(number) => Self(number.to_string()),
        }
    }
}

/// One named unit of rich-text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: ItemId,
    pub name: String,
    /// Opaque formatted-text blob; the store never interprets it.
    #[serde(default)]
    pub content: String,
    /// Folder to restore into on unarchive. Set only while archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_folder_id: Option<ItemId>,
}

impl File {
    /// Creates an empty file with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ItemId::generate(), name)
    }

    /// Creates an empty file with a caller-provided id.
    pub fn with_id(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            content: String::new(),
            original_folder_id: None,
        }
    }
}

/// Named ordered container of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: ItemId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<File>,
}

impl Folder {
    /// Creates an empty folder with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ItemId::generate(), name)
    }

    /// Creates an empty folder with a caller-provided id.
    pub fn with_id(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            files: Vec::new(),
        }
    }

    /// The folder a fresh store is seeded with.
    pub fn default_notes() -> Self {
        Self::with_id(ItemId::from(DEFAULT_FOLDER_ID), DEFAULT_FOLDER_NAME)
    }

    pub fn file(&self, file_id: &ItemId) -> Option<&File> {
        self.files.iter().find(|file| &file.id == file_id)
    }

    pub fn contains_file(&self, file_id: &ItemId) -> bool {
        self.file(file_id).is_some()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<File>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<File>>::deserialize(deserializer)?.unwrap_or_default())
}

/// What the folder list currently has selected.
///
/// `Favorites` and `Archive` are virtual views backed by flat collections,
/// never entries of the folder list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FolderSelection {
    Folder(ItemId),
    Favorites,
    Archive,
}

impl FolderSelection {
    /// Returns the folder id for a regular folder selection.
    pub fn folder_id(&self) -> Option<&ItemId> {
        match self {
            Self::Folder(id) => Some(id),
            Self::Favorites | Self::Archive => None,
        }
    }
}
