//! Folder/file store use-case service.
//!
//! # Responsibility
//! - Own the canonical folder/file/favorite/archive state.
//! - Apply mutating operations and persist after each state change.
//! - Hydrate from the snapshot repository on open.
//!
//! # Invariants
//! - Every operation fully applies or has no effect: mutations run on a
//!   staged copy that replaces the current state only after it is saved.
//! - A rejected operation (`NotFound`, out-of-range index) leaves state
//!   untouched and does not persist.
//! - Selection changes never persist.
//! - Favorites hold references; deleting a file drops its reference.
//! - Archived files carry `original_folder_id`; live files never do.

use crate::model::item::{File, Folder, FolderSelection, ItemId};
use crate::model::order::move_item;
use crate::model::state::StoreState;
use crate::repo::snapshot_repo::{
    load_snapshot, save_snapshot, LoadedSnapshot, RepoError, SnapshotRepository, StoreSnapshot,
};
use crate::service::projection;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by folder store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from folder store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced folder does not exist.
    FolderNotFound(ItemId),
    /// Referenced file does not exist in the searched collection.
    FileNotFound(ItemId),
    /// Reorder source index is outside the sequence.
    IndexOutOfRange { index: usize, len: usize },
    /// Snapshot could not be saved; the operation was not applied.
    Persist(RepoError),
}

impl StoreError {
    /// Whether this error is a rejected lookup rather than a storage failure.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::Persist(_))
    }

    fn code(&self) -> &'static str {
        match self {
            Self::FolderNotFound(_) => "folder_not_found",
            Self::FileNotFound(_) => "file_not_found",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::Persist(_) => "persist_failed",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::FileNotFound(id) => write!(f, "file not found: {id}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for length {len}")
            }
            Self::Persist(err) => write!(f, "failed to persist store: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persist(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Persist(value)
    }
}

/// Turns rejected lookups into silent no-ops for forgiving callers.
pub trait StoreResultExt<T> {
    /// Maps not-found style errors to `Ok(None)`; storage errors pass through.
    fn ignore_not_found(self) -> StoreResult<Option<T>>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn ignore_not_found(self) -> StoreResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Where an unarchived file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnarchiveOutcome {
    /// Returned to its original folder.
    Restored(ItemId),
    /// Original folder is gone; appended to the first folder instead.
    Relocated(ItemId),
    /// No folder exists; the file was discarded.
    Dropped,
}

/// Folder/file store facade.
pub struct FolderStore<R: SnapshotRepository> {
    repo: R,
    state: StoreState,
}

impl<R: SnapshotRepository> FolderStore<R> {
    /// Hydrates a store from `repo`.
    ///
    /// Missing or malformed collections fall back to defaults: a single
    /// `Notes` folder, an empty archive, no favorites. Selection always
    /// starts empty. Never fails.
    pub fn open(repo: R) -> Self {
        let state = hydrate(load_snapshot(&repo));
        info!(
            "event=store_open module=store status=ok folders={} archived={} favorites={}",
            state.folders.len(),
            state.archived_files.len(),
            state.favorites.len()
        );
        Self { repo, state }
    }

    /// Writes the final snapshot and hands the repository back.
    pub fn shutdown(self) -> StoreResult<R> {
        self.save("shutdown", &self.state)?;
        info!("event=store_shutdown module=store status=ok");
        Ok(self.repo)
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Borrowed view of what a save would write right now.
    pub fn snapshot(&self) -> StoreSnapshot<'_> {
        snapshot_of(&self.state)
    }

    /// Appends a new empty folder. Any name is accepted.
    pub fn create_folder(&mut self, name: impl Into<String>) -> StoreResult<ItemId> {
        let folder = Folder::new(name);
        let folder_id = folder.id.clone();
        let mut next = self.state.clone();
        next.folders.push(folder);

        self.commit("folder_create", next)?;
        debug!("event=folder_create module=store status=ok folder_id={folder_id}");
        Ok(folder_id)
    }

    /// Removes a folder and discards its files.
    ///
    /// Clears both selections when the folder was selected.
    pub fn delete_folder(&mut self, folder_id: &ItemId) -> StoreResult<()> {
        let Some(index) = self.folder_index(folder_id) else {
            return reject("folder_delete", StoreError::FolderNotFound(folder_id.clone()));
        };

        let mut next = self.state.clone();
        let removed = next.folders.remove(index);
        for file in &removed.files {
            next.forget_favorite(&file.id);
        }
        let was_selected = next
            .selected_folder
            .as_ref()
            .and_then(FolderSelection::folder_id)
            == Some(folder_id);
        if was_selected {
            next.selected_folder = None;
            next.selected_file = None;
        }

        self.commit("folder_delete", next)?;
        debug!(
            "event=folder_delete module=store status=ok folder_id={} discarded_files={}",
            folder_id,
            removed.files.len()
        );
        Ok(())
    }

    /// Renames a folder.
    pub fn rename_folder(
        &mut self,
        folder_id: &ItemId,
        name: impl Into<String>,
    ) -> StoreResult<()> {
        let name = name.into();
        let Some(index) = self.folder_index(folder_id) else {
            return reject("folder_rename", StoreError::FolderNotFound(folder_id.clone()));
        };
        if self.state.folders[index].name == name {
            return Ok(());
        }

        let mut next = self.state.clone();
        next.folders[index].name = name;
        self.commit("folder_rename", next)
    }

    /// Sets the folder selection. Leaves `selected_file` as is.
    pub fn select_folder(&mut self, target: Option<FolderSelection>) {
        self.state.selected_folder = target;
    }

    /// Sets the edited file pointer without checking that it exists.
    pub fn select_file(&mut self, file_id: Option<ItemId>) {
        self.state.selected_file = file_id;
    }

    /// Appends an empty file to `folder_id`.
    pub fn create_file(
        &mut self,
        folder_id: &ItemId,
        name: impl Into<String>,
    ) -> StoreResult<ItemId> {
        let Some(index) = self.folder_index(folder_id) else {
            return reject("file_create", StoreError::FolderNotFound(folder_id.clone()));
        };
        let file = File::new(name);
        let file_id = file.id.clone();
        let mut next = self.state.clone();
        next.folders[index].files.push(file);

        self.commit("file_create", next)?;
        debug!("event=file_create module=store status=ok folder_id={folder_id} file_id={file_id}");
        Ok(file_id)
    }

    /// Replaces the content of a file living in a folder.
    ///
    /// The archive is not searched.
    pub fn update_file_content(
        &mut self,
        file_id: &ItemId,
        content: impl Into<String>,
    ) -> StoreResult<()> {
        let content = content.into();
        let Some((folder_index, file_index)) = self.live_file_position(file_id) else {
            return reject("file_update", StoreError::FileNotFound(file_id.clone()));
        };
        if self.state.folders[folder_index].files[file_index].content == content {
            return Ok(());
        }

        let mut next = self.state.clone();
        next.folders[folder_index].files[file_index].content = content;
        self.commit("file_update", next)
    }

    /// Renames a file wherever it lives: folders first, then archive.
    pub fn rename_file(&mut self, file_id: &ItemId, name: impl Into<String>) -> StoreResult<()> {
        let name = name.into();
        match self.state.any_file(file_id) {
            None => return reject("file_rename", StoreError::FileNotFound(file_id.clone())),
            Some(file) if file.name == name => return Ok(()),
            Some(_) => {}
        }

        let mut next = self.state.clone();
        if let Some(file) = next.any_file_mut(file_id) {
            file.name = name;
        }
        self.commit("file_rename", next)
    }

    /// Removes a file from `folder_id`.
    ///
    /// A file that lives elsewhere is `FileNotFound` and the selection is
    /// left alone.
    pub fn delete_file(&mut self, folder_id: &ItemId, file_id: &ItemId) -> StoreResult<()> {
        let Some(folder_index) = self.folder_index(folder_id) else {
            return reject("file_delete", StoreError::FolderNotFound(folder_id.clone()));
        };
        let Some(file_index) = self.state.folders[folder_index]
            .files
            .iter()
            .position(|file| &file.id == file_id)
        else {
            return reject("file_delete", StoreError::FileNotFound(file_id.clone()));
        };

        let mut next = self.state.clone();
        next.folders[folder_index].files.remove(file_index);
        discard_file_refs(&mut next, file_id);

        self.commit("file_delete", next)?;
        debug!("event=file_delete module=store status=ok folder_id={folder_id} file_id={file_id}");
        Ok(())
    }

    /// Permanently removes a file from the archive.
    pub fn delete_archived_file(&mut self, file_id: &ItemId) -> StoreResult<()> {
        let Some(index) = self.archive_index(file_id) else {
            return reject("archive_delete", StoreError::FileNotFound(file_id.clone()));
        };

        let mut next = self.state.clone();
        next.archived_files.remove(index);
        discard_file_refs(&mut next, file_id);

        self.commit("archive_delete", next)?;
        debug!("event=archive_delete module=store status=ok file_id={file_id}");
        Ok(())
    }

    /// Moves the folder at `source` to `target` (index after removal).
    pub fn reorder_folders(&mut self, source: usize, target: usize) -> StoreResult<()> {
        if !plan_move(self.state.folders.len(), source, target, "folder_reorder")? {
            return Ok(());
        }

        let mut next = self.state.clone();
        move_item(&mut next.folders, source, target);
        self.commit("folder_reorder", next)
    }

    /// Moves the file at `source` to `target` within one folder.
    pub fn reorder_files(
        &mut self,
        folder_id: &ItemId,
        source: usize,
        target: usize,
    ) -> StoreResult<()> {
        let Some(index) = self.folder_index(folder_id) else {
            return reject("file_reorder", StoreError::FolderNotFound(folder_id.clone()));
        };
        let len = self.state.folders[index].files.len();
        if !plan_move(len, source, target, "file_reorder")? {
            return Ok(());
        }

        let mut next = self.state.clone();
        move_item(&mut next.folders[index].files, source, target);
        self.commit("file_reorder", next)
    }

    /// Moves a file from its folder to the archive, recording provenance.
    ///
    /// `folder_hint` is informational; the folder scan decides the owner.
    pub fn archive_file(&mut self, folder_hint: &ItemId, file_id: &ItemId) -> StoreResult<()> {
        let Some((folder_index, file_index)) = self.live_file_position(file_id) else {
            return reject("file_archive", StoreError::FileNotFound(file_id.clone()));
        };
        let owner = self.state.folders[folder_index].id.clone();
        if &owner != folder_hint {
            debug!(
                "event=file_archive module=store status=hint_mismatch hint={} owner={}",
                folder_hint, owner
            );
        }

        let mut next = self.state.clone();
        let mut file = next.folders[folder_index].files.remove(file_index);
        file.original_folder_id = Some(owner.clone());
        next.archived_files.push(file);

        self.commit("file_archive", next)?;
        debug!("event=file_archive module=store status=ok folder_id={owner} file_id={file_id}");
        Ok(())
    }

    /// Moves a file out of the archive.
    ///
    /// Goes back to its original folder when it still exists, otherwise to
    /// the first folder; with no folders at all the file is discarded.
    pub fn unarchive_file(&mut self, file_id: &ItemId) -> StoreResult<UnarchiveOutcome> {
        let Some(index) = self.archive_index(file_id) else {
            return reject("file_unarchive", StoreError::FileNotFound(file_id.clone()));
        };
        let destination = self.state.archived_files[index]
            .original_folder_id
            .as_ref()
            .and_then(|id| self.folder_index(id))
            .map(|folder_index| (folder_index, true))
            .or_else(|| (!self.state.folders.is_empty()).then_some((0, false)));

        let mut next = self.state.clone();
        let mut file = next.archived_files.remove(index);
        file.original_folder_id = None;

        let outcome = match destination {
            Some((folder_index, is_original)) => {
                let folder = &mut next.folders[folder_index];
                folder.files.push(file);
                if is_original {
                    UnarchiveOutcome::Restored(folder.id.clone())
                } else {
                    UnarchiveOutcome::Relocated(folder.id.clone())
                }
            }
            None => {
                discard_file_refs(&mut next, file_id);
                UnarchiveOutcome::Dropped
            }
        };

        self.commit("file_unarchive", next)?;
        if outcome == UnarchiveOutcome::Dropped {
            warn!(
                "event=file_unarchive module=store status=dropped file_id={file_id} reason=no_folders"
            );
        }
        debug!("event=file_unarchive module=store status=ok file_id={file_id} outcome={outcome:?}");
        Ok(outcome)
    }

    /// Flips favorite membership, returning whether the file is now a
    /// favorite.
    ///
    /// Adding requires the file to live in a folder; removing does not.
    pub fn toggle_favorite(&mut self, file_id: &ItemId) -> StoreResult<bool> {
        let now_favorite = if self.state.is_favorite(file_id) {
            false
        } else if self.state.live_file(file_id).is_some() {
            true
        } else {
            return reject("favorite_toggle", StoreError::FileNotFound(file_id.clone()));
        };

        let mut next = self.state.clone();
        if now_favorite {
            next.favorites.push(file_id.clone());
        } else {
            next.forget_favorite(file_id);
        }

        self.commit("favorite_toggle", next)?;
        debug!(
            "event=favorite_toggle module=store status=ok file_id={file_id} favorite={now_favorite}"
        );
        Ok(now_favorite)
    }

    /// The file the editor should show, if any.
    pub fn resolve_selected_file(&self) -> Option<&File> {
        projection::resolve_selected_file(&self.state)
    }

    /// Files listed for the current folder selection.
    pub fn displayed_files(&self) -> Vec<&File> {
        projection::displayed_files(
            self.state.selected_folder.as_ref(),
            &self.state.folders,
            &self.state.favorites,
            &self.state.archived_files,
        )
    }

    pub fn is_favorite(&self, file_id: &ItemId) -> bool {
        self.state.is_favorite(file_id)
    }

    fn folder_index(&self, folder_id: &ItemId) -> Option<usize> {
        self.state
            .folders
            .iter()
            .position(|folder| &folder.id == folder_id)
    }

    fn archive_index(&self, file_id: &ItemId) -> Option<usize> {
        self.state
            .archived_files
            .iter()
            .position(|file| &file.id == file_id)
    }

    /// `(folder index, file index)` of a file living in a folder.
    fn live_file_position(&self, file_id: &ItemId) -> Option<(usize, usize)> {
        self.state
            .folders
            .iter()
            .enumerate()
            .find_map(|(folder_index, folder)| {
                folder
                    .files
                    .iter()
                    .position(|file| &file.id == file_id)
                    .map(|file_index| (folder_index, file_index))
            })
    }

    /// Saves `next` and makes it the current state.
    ///
    /// On failure the current state is kept as it was.
    fn commit(&mut self, op: &'static str, next: StoreState) -> StoreResult<()> {
        self.save(op, &next)?;
        self.state = next;
        Ok(())
    }

    fn save(&self, op: &'static str, state: &StoreState) -> StoreResult<()> {
        save_snapshot(&self.repo, &snapshot_of(state)).map_err(|err| {
            error!(
                "event=store_persist module=store status=error op={} error_code=persist_failed error={}",
                op, err
            );
            StoreError::Persist(err)
        })
    }
}

fn snapshot_of(state: &StoreState) -> StoreSnapshot<'_> {
    StoreSnapshot {
        folders: &state.folders,
        favorite_files: state
            .favorites
            .iter()
            .filter_map(|id| state.any_file(id))
            .collect(),
        archived_files: &state.archived_files,
    }
}

fn discard_file_refs(state: &mut StoreState, file_id: &ItemId) {
    state.forget_favorite(file_id);
    if state.selected_file.as_ref() == Some(file_id) {
        state.selected_file = None;
    }
}

fn hydrate(loaded: LoadedSnapshot) -> StoreState {
    let folders = loaded
        .folders
        .unwrap_or_else(|| vec![Folder::default_notes()]);
    let mut state = StoreState {
        folders,
        archived_files: loaded.archived_files.unwrap_or_default(),
        favorites: loaded
            .favorite_files
            .unwrap_or_default()
            .into_iter()
            .map(|file| file.id)
            .collect(),
        selected_folder: None,
        selected_file: None,
    };

    let removed = state.enforce_unique_ids();
    if removed > 0 {
        warn!(
            "event=store_open module=store status=degraded error_code=duplicate_or_dangling removed={}",
            removed
        );
    }
    state
}

/// Validates one move; `Ok(false)` means the order would not change.
fn plan_move(len: usize, source: usize, target: usize, op: &'static str) -> StoreResult<bool> {
    if source >= len {
        return reject(op, StoreError::IndexOutOfRange { index: source, len });
    }
    Ok(target.min(len - 1) != source)
}

fn reject<T>(op: &'static str, err: StoreError) -> StoreResult<T> {
    debug!(
        "event={} module=store status=rejected error_code={} detail={}",
        op,
        err.code(),
        err
    );
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::{FolderStore, StoreError, StoreResultExt};
    use crate::model::item::ItemId;
    use crate::repo::snapshot_repo::MemorySnapshotRepository;

    #[test]
    fn ignore_not_found_keeps_storage_errors() {
        let missing: Result<(), StoreError> = Err(StoreError::FileNotFound(ItemId::from("x")));
        assert_eq!(missing.ignore_not_found().unwrap(), None);

        let ok: Result<u8, StoreError> = Ok(3);
        assert_eq!(ok.ignore_not_found().unwrap(), Some(3));

        let oob: Result<(), StoreError> = Err(StoreError::IndexOutOfRange { index: 4, len: 1 });
        assert!(oob.ignore_not_found().is_ok());
    }

    #[test]
    fn identity_reorder_does_not_persist() {
        let repo = MemorySnapshotRepository::new();
        let mut store = FolderStore::open(&repo);
        store.create_folder("Second").unwrap();
        let writes = repo.write_count();

        store.reorder_folders(1, 1).unwrap();
        store.reorder_folders(1, 9).unwrap();
        assert_eq!(repo.write_count(), writes);

        store.reorder_folders(1, 0).unwrap();
        assert_eq!(repo.write_count(), writes + 1);
        assert_eq!(store.state().folders[0].name, "Second");
    }

    #[test]
    fn selection_changes_do_not_persist() {
        let repo = MemorySnapshotRepository::new();
        let mut store = FolderStore::open(&repo);
        store.select_folder(Some(crate::model::item::FolderSelection::Archive));
        store.select_file(Some(ItemId::from("anything")));
        assert_eq!(repo.write_count(), 0);
    }
}
