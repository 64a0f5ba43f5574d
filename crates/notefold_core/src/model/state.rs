//! Aggregate store state.
//!
//! # Responsibility
//! - Hold folders, archive, favorite references and selection.
//! - Provide lookup helpers used by store operations and projections.
//!
//! # Invariants
//! - Folder ids are unique across `folders`.
//! - File ids are unique across all folder file lists and `archived_files`.
//! - `favorites` holds ids only; a favorite never owns a file.

use super::item::{File, Folder, FolderSelection, ItemId};
use std::collections::HashSet;

/// Canonical in-memory state owned by the folder store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// User folders in display order.
    pub folders: Vec<Folder>,
    /// Archived files in archive order, each carrying provenance.
    pub archived_files: Vec<File>,
    /// Favorite file references in favorite order.
    pub favorites: Vec<ItemId>,
    /// Session-only; never persisted.
    pub selected_folder: Option<FolderSelection>,
    /// Session-only; never persisted.
    pub selected_file: Option<ItemId>,
}

impl StoreState {
    pub fn folder(&self, folder_id: &ItemId) -> Option<&Folder> {
        self.folders.iter().find(|folder| &folder.id == folder_id)
    }

    pub fn folder_mut(&mut self, folder_id: &ItemId) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|folder| &folder.id == folder_id)
    }

    /// Iterates every file that lives in a folder, in display order.
    pub fn live_files(&self) -> impl Iterator<Item = &File> {
        self.folders.iter().flat_map(|folder| folder.files.iter())
    }

    /// Finds a file across all folder file lists.
    pub fn live_file(&self, file_id: &ItemId) -> Option<&File> {
        self.live_files().find(|file| &file.id == file_id)
    }

    pub fn live_file_mut(&mut self, file_id: &ItemId) -> Option<&mut File> {
        self.folders
            .iter_mut()
            .flat_map(|folder| folder.files.iter_mut())
            .find(|file| &file.id == file_id)
    }

    /// Returns the id of the folder currently holding `file_id`.
    pub fn owning_folder_id(&self, file_id: &ItemId) -> Option<&ItemId> {
        self.folders
            .iter()
            .find(|folder| folder.contains_file(file_id))
            .map(|folder| &folder.id)
    }

    pub fn archived_file(&self, file_id: &ItemId) -> Option<&File> {
        self.archived_files.iter().find(|file| &file.id == file_id)
    }

    /// Resolves a file wherever it lives: folders first, then archive.
    pub fn any_file(&self, file_id: &ItemId) -> Option<&File> {
        self.live_file(file_id)
            .or_else(|| self.archived_file(file_id))
    }

    pub fn any_file_mut(&mut self, file_id: &ItemId) -> Option<&mut File> {
        self.folders
            .iter_mut()
            .flat_map(|folder| folder.files.iter_mut())
            .chain(self.archived_files.iter_mut())
            .find(|file| &file.id == file_id)
    }

    pub fn is_favorite(&self, file_id: &ItemId) -> bool {
        self.favorites.iter().any(|id| id == file_id)
    }

    /// Resolves a favorite reference to the file's current record.
    pub fn favorite_file(&self, file_id: &ItemId) -> Option<&File> {
        if !self.is_favorite(file_id) {
            return None;
        }
        self.any_file(file_id)
    }

    /// Drops the favorite reference for `file_id`, returning whether one
    /// existed.
    pub(crate) fn forget_favorite(&mut self, file_id: &ItemId) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|id| id != file_id);
        self.favorites.len() != before
    }

    /// Restores uniqueness after loading untrusted data.
    ///
    /// Keeps the first occurrence of every folder id and file id, drops
    /// favorite references that resolve nowhere, and returns how many
    /// entries were removed.
    pub(crate) fn enforce_unique_ids(&mut self) -> usize {
        let mut removed = 0;

        let mut folder_ids = HashSet::new();
        let before = self.folders.len();
        self.folders.retain(|folder| folder_ids.insert(folder.id.clone()));
        removed += before - self.folders.len();

        let mut file_ids = HashSet::new();
        for folder in &mut self.folders {
            let before = folder.files.len();
            folder.files.retain(|file| file_ids.insert(file.id.clone()));
            removed += before - folder.files.len();
            for file in &mut folder.files {
                file.original_folder_id = None;
            }
        }
        let before = self.archived_files.len();
        self.archived_files
            .retain(|file| file_ids.insert(file.id.clone()));
        removed += before - self.archived_files.len();

        let mut favorite_ids = HashSet::new();
        let before = self.favorites.len();
        self.favorites
            .retain(|id| file_ids.contains(id) && favorite_ids.insert(id.clone()));
        removed += before - self.favorites.len();

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::StoreState;
    use crate::model::item::{File, Folder, ItemId};

    fn file(id: &str) -> File {
        File::with_id(ItemId::from(id), id)
    }

    #[test]
    fn enforce_unique_ids_keeps_first_occurrence() {
        let mut first = Folder::with_id(ItemId::from("a"), "A");
        first.files.push(file("f1"));
        let mut dup_folder = Folder::with_id(ItemId::from("a"), "A again");
        dup_folder.files.push(file("f2"));
        let mut second = Folder::with_id(ItemId::from("b"), "B");
        second.files.push(file("f1"));
        second.files.push(file("f3"));

        let mut state = StoreState {
            folders: vec![first, dup_folder, second],
            archived_files: vec![file("f3"), file("f4")],
            favorites: vec![
                ItemId::from("f4"),
                ItemId::from("missing"),
                ItemId::from("f4"),
            ],
            ..StoreState::default()
        };

        let removed = state.enforce_unique_ids();
        assert_eq!(removed, 5);
        assert_eq!(state.folders.len(), 2);
        assert_eq!(state.folders[0].name, "A");
        assert_eq!(state.folders[1].files.len(), 1);
        assert_eq!(state.folders[1].files[0].id, "f3");
        assert_eq!(state.archived_files.len(), 1);
        assert_eq!(state.archived_files[0].id, "f4");
        assert_eq!(state.favorites, vec![ItemId::from("f4")]);
    }

    #[test]
    fn favorite_file_resolves_live_then_archive() {
        let mut folder = Folder::with_id(ItemId::from("a"), "A");
        folder.files.push(file("live"));
        let state = StoreState {
            folders: vec![folder],
            archived_files: vec![file("old")],
            favorites: vec![ItemId::from("live"), ItemId::from("old")],
            ..StoreState::default()
        };

        assert!(state.favorite_file(&ItemId::from("live")).is_some());
        assert!(state.favorite_file(&ItemId::from("old")).is_some());
        assert!(state.favorite_file(&ItemId::from("other")).is_none());
        assert_eq!(
            state.owning_folder_id(&ItemId::from("live")),
            Some(&ItemId::from("a"))
        );
    }
}
