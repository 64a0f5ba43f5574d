use notefold_core::{
    FolderSelection, FolderStore, ItemId, MemorySnapshotRepository, RepoError, RepoResult,
    SnapshotKey, SnapshotRepository, StoreError, StoreResultExt, UnarchiveOutcome,
    DEFAULT_FOLDER_ID,
};
use std::cell::Cell;
use std::collections::HashSet;

/// In-memory repository whose writes can be switched to fail.
struct FlakyRepository {
    inner: MemorySnapshotRepository,
    failing: Cell<bool>,
}

impl FlakyRepository {
    fn new() -> Self {
        Self {
            inner: MemorySnapshotRepository::new(),
            failing: Cell::new(false),
        }
    }
}

impl SnapshotRepository for FlakyRepository {
    fn read_entry(&self, key: SnapshotKey) -> RepoResult<Option<String>> {
        self.inner.read_entry(key)
    }

    fn write_entries(&self, entries: &[(SnapshotKey, String)]) -> RepoResult<()> {
        if self.failing.get() {
            return Err(RepoError::MissingRequiredTable("snapshot_entries"));
        }
        self.inner.write_entries(entries)
    }
}

fn notes_id() -> ItemId {
    ItemId::from(DEFAULT_FOLDER_ID)
}

fn file_names(store: &FolderStore<&MemorySnapshotRepository>, folder_id: &ItemId) -> Vec<String> {
    store
        .state()
        .folder(folder_id)
        .unwrap()
        .files
        .iter()
        .map(|file| file.name.clone())
        .collect()
}

fn assert_unique_ids(store: &FolderStore<&MemorySnapshotRepository>) {
    let state = store.state();
    let mut folder_ids = HashSet::new();
    for folder in &state.folders {
        assert!(folder_ids.insert(folder.id.clone()), "duplicate folder {}", folder.id);
    }
    let mut file_ids = HashSet::new();
    for file in state.live_files().chain(state.archived_files.iter()) {
        assert!(file_ids.insert(file.id.clone()), "duplicate file {}", file.id);
    }
}

#[test]
fn fresh_store_starts_with_default_notes_folder() {
    let repo = MemorySnapshotRepository::new();
    let store = FolderStore::open(&repo);

    let state = store.state();
    assert_eq!(state.folders.len(), 1);
    assert_eq!(state.folders[0].id, DEFAULT_FOLDER_ID);
    assert_eq!(state.folders[0].name, "Notes");
    assert!(state.folders[0].files.is_empty());
    assert!(state.archived_files.is_empty());
    assert!(state.favorites.is_empty());
    assert!(state.selected_folder.is_none());
    assert!(state.selected_file.is_none());
}

#[test]
fn notes_scenario_create_edit_archive_unarchive() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();

    let todo = store.create_file(&notes, "todo").unwrap();
    let folder = store.state().folder(&notes).unwrap();
    assert_eq!(folder.files.len(), 1);
    assert_eq!(folder.files[0].name, "todo");
    assert_eq!(folder.files[0].content, "");

    store.update_file_content(&todo, "<p>buy milk</p>").unwrap();
    store.select_file(Some(todo.clone()));
    assert_eq!(
        store.resolve_selected_file().map(|file| file.content.as_str()),
        Some("<p>buy milk</p>")
    );

    store.archive_file(&notes, &todo).unwrap();
    assert!(store.state().folder(&notes).unwrap().files.is_empty());
    assert_eq!(store.state().archived_files.len(), 1);
    assert_eq!(
        store.state().archived_files[0].original_folder_id,
        Some(notes.clone())
    );

    let outcome = store.unarchive_file(&todo).unwrap();
    assert_eq!(outcome, UnarchiveOutcome::Restored(notes.clone()));
    let folder = store.state().folder(&notes).unwrap();
    assert_eq!(folder.files.len(), 1);
    assert_eq!(folder.files[0].id, todo);
    assert!(folder.files[0].original_folder_id.is_none());
    assert!(store.state().archived_files.is_empty());
}

#[test]
fn create_folder_accepts_duplicate_and_empty_names() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);

    let first = store.create_folder("Work").unwrap();
    let second = store.create_folder("Work").unwrap();
    let blank = store.create_folder("").unwrap();

    assert_ne!(first, second);
    assert_eq!(store.state().folders.len(), 4);
    assert_eq!(store.state().folder(&blank).unwrap().name, "");
    assert_unique_ids(&store);
}

#[test]
fn create_file_in_missing_folder_is_rejected_without_change() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let before = store.state().clone();

    let err = store
        .create_file(&ItemId::from("missing"), "x")
        .unwrap_err();
    assert!(matches!(err, StoreError::FolderNotFound(id) if id == "missing"));
    assert_eq!(store.state(), &before);
    assert_eq!(repo.write_count(), 0);

    let ignored = store
        .create_file(&ItemId::from("missing"), "x")
        .ignore_not_found()
        .unwrap();
    assert!(ignored.is_none());
}

#[test]
fn reorder_files_uses_splice_semantics() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    for name in ["A", "B", "C"] {
        store.create_file(&notes, name).unwrap();
    }

    store.reorder_files(&notes, 0, 2).unwrap();
    assert_eq!(file_names(&store, &notes), vec!["B", "C", "A"]);

    store.reorder_files(&notes, 2, 0).unwrap();
    assert_eq!(file_names(&store, &notes), vec!["A", "B", "C"]);

    store.reorder_files(&notes, 2, 0).unwrap();
    assert_eq!(file_names(&store, &notes), vec!["C", "A", "B"]);

    let err = store.reorder_files(&notes, 3, 0).unwrap_err();
    assert!(matches!(err, StoreError::IndexOutOfRange { index: 3, len: 3 }));
    assert_eq!(file_names(&store, &notes), vec!["C", "A", "B"]);
}

#[test]
fn reorder_folders_moves_top_level_sequence() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    store.create_folder("Work").unwrap();
    store.create_folder("Ideas").unwrap();

    store.reorder_folders(0, 2).unwrap();
    let names: Vec<&str> = store
        .state()
        .folders
        .iter()
        .map(|folder| folder.name.as_str())
        .collect();
    assert_eq!(names, vec!["Work", "Ideas", "Notes"]);
}

#[test]
fn deleting_selected_folder_clears_selection() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let work = store.create_folder("Work").unwrap();
    let file = store.create_file(&work, "plan").unwrap();

    store.select_folder(Some(FolderSelection::Folder(work.clone())));
    store.select_file(Some(file.clone()));
    assert!(store.resolve_selected_file().is_some());

    store.delete_folder(&work).unwrap();
    assert!(store.state().selected_folder.is_none());
    assert!(store.state().selected_file.is_none());
    assert!(store.state().folder(&work).is_none());
    assert!(store.state().archived_files.is_empty());
}

#[test]
fn deleting_other_folder_keeps_selection() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let work = store.create_folder("Work").unwrap();

    store.select_folder(Some(FolderSelection::Folder(notes_id())));
    store.delete_folder(&work).unwrap();
    assert_eq!(
        store.state().selected_folder,
        Some(FolderSelection::Folder(notes_id()))
    );
}

#[test]
fn select_folder_does_not_clear_selected_file() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    store.select_file(Some(ItemId::from("anything")));
    store.select_folder(Some(FolderSelection::Favorites));
    assert_eq!(store.state().selected_file, Some(ItemId::from("anything")));
}

#[test]
fn delete_file_clears_matching_selection_and_favorite() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let keep = store.create_file(&notes, "keep").unwrap();
    let gone = store.create_file(&notes, "gone").unwrap();
    store.toggle_favorite(&gone).unwrap();
    store.select_file(Some(gone.clone()));

    store.delete_file(&notes, &gone).unwrap();
    assert!(store.state().selected_file.is_none());
    assert!(!store.is_favorite(&gone));
    assert_eq!(file_names(&store, &notes), vec!["keep"]);

    let err = store.delete_file(&notes, &gone).unwrap_err();
    assert!(matches!(err, StoreError::FileNotFound(_)));

    store.select_file(Some(keep.clone()));
    let err = store.delete_file(&ItemId::from("other"), &keep).unwrap_err();
    assert!(matches!(err, StoreError::FolderNotFound(_)));
    assert_eq!(store.state().selected_file, Some(keep));
}

#[test]
fn delete_file_from_wrong_folder_keeps_selection() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let work = store.create_folder("Work").unwrap();
    let plan = store.create_file(&notes, "plan").unwrap();
    store.select_file(Some(plan.clone()));
    let writes = repo.write_count();

    let err = store.delete_file(&work, &plan).unwrap_err();
    assert!(matches!(err, StoreError::FileNotFound(_)));
    assert_eq!(store.state().selected_file, Some(plan));
    assert_eq!(file_names(&store, &notes), vec!["plan"]);
    assert_eq!(repo.write_count(), writes);
}

#[test]
fn update_file_content_ignores_archive() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let file = store.create_file(&notes, "draft").unwrap();
    store.archive_file(&notes, &file).unwrap();

    let err = store.update_file_content(&file, "late edit").unwrap_err();
    assert!(matches!(err, StoreError::FileNotFound(_)));
    assert_eq!(store.state().archived_files[0].content, "");
}

#[test]
fn archive_file_scans_all_folders_ignoring_hint() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let work = store.create_folder("Work").unwrap();
    let file = store.create_file(&work, "report").unwrap();

    store.archive_file(&notes_id(), &file).unwrap();
    assert_eq!(store.state().archived_files[0].original_folder_id, Some(work));

    let err = store.archive_file(&notes_id(), &file).unwrap_err();
    assert!(matches!(err, StoreError::FileNotFound(_)));
    assert_eq!(store.state().archived_files.len(), 1);
}

#[test]
fn unarchive_relocates_to_first_folder_when_original_is_gone() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let work = store.create_folder("Work").unwrap();
    let file = store.create_file(&work, "report").unwrap();
    store.archive_file(&work, &file).unwrap();
    store.delete_folder(&work).unwrap();

    let outcome = store.unarchive_file(&file).unwrap();
    assert_eq!(outcome, UnarchiveOutcome::Relocated(notes_id()));
    assert_eq!(file_names(&store, &notes_id()), vec!["report"]);
    assert_unique_ids(&store);
}

#[test]
fn unarchive_drops_file_when_no_folders_remain() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let file = store.create_file(&notes, "lonely").unwrap();
    store.archive_file(&notes, &file).unwrap();
    store.toggle_favorite(&file).unwrap_err();
    store.delete_folder(&notes).unwrap();

    let outcome = store.unarchive_file(&file).unwrap();
    assert_eq!(outcome, UnarchiveOutcome::Dropped);
    assert!(store.state().folders.is_empty());
    assert!(store.state().archived_files.is_empty());

    let err = store.unarchive_file(&file).unwrap_err();
    assert!(matches!(err, StoreError::FileNotFound(_)));
}

#[test]
fn archive_position_is_not_preserved_on_unarchive() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let first = store.create_file(&notes, "first").unwrap();
    store.create_file(&notes, "second").unwrap();

    store.archive_file(&notes, &first).unwrap();
    store.unarchive_file(&first).unwrap();
    assert_eq!(file_names(&store, &notes), vec!["second", "first"]);
}

#[test]
fn toggle_favorite_twice_restores_membership() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let a = store.create_file(&notes, "a").unwrap();
    let b = store.create_file(&notes, "b").unwrap();
    store.toggle_favorite(&a).unwrap();
    let before = store.state().favorites.clone();

    assert!(store.toggle_favorite(&b).unwrap());
    assert!(!store.toggle_favorite(&b).unwrap());
    assert_eq!(store.state().favorites, before);

    let err = store.toggle_favorite(&ItemId::from("missing")).unwrap_err();
    assert!(matches!(err, StoreError::FileNotFound(_)));
}

#[test]
fn favorites_view_reflects_later_edits_and_archive() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let file = store.create_file(&notes, "starred").unwrap();
    store.toggle_favorite(&file).unwrap();
    store.update_file_content(&file, "<p>v2</p>").unwrap();

    store.select_folder(Some(FolderSelection::Favorites));
    store.select_file(Some(file.clone()));
    assert_eq!(
        store.resolve_selected_file().map(|f| f.content.as_str()),
        Some("<p>v2</p>")
    );

    store.archive_file(&notes, &file).unwrap();
    assert!(store.is_favorite(&file));
    let shown: Vec<&str> = store
        .displayed_files()
        .into_iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(shown, vec!["starred"]);

    // Archived favorites can still be removed, but not added.
    assert!(!store.toggle_favorite(&file).unwrap());
    assert!(store.toggle_favorite(&file).is_err());
}

#[test]
fn resolve_selected_file_is_absent_for_foreign_ids() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let file = store.create_file(&notes, "live").unwrap();

    store.select_file(Some(ItemId::from("ghost")));
    assert!(store.resolve_selected_file().is_none());

    store.select_file(Some(file));
    store.select_folder(Some(FolderSelection::Archive));
    assert!(store.resolve_selected_file().is_none());
}

#[test]
fn displayed_files_follows_selection() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let kept = store.create_file(&notes, "kept").unwrap();
    let old = store.create_file(&notes, "old").unwrap();
    store.archive_file(&notes, &old).unwrap();

    assert!(store.displayed_files().is_empty());

    store.select_folder(Some(FolderSelection::Folder(notes.clone())));
    assert_eq!(store.displayed_files()[0].id, kept);

    store.select_folder(Some(FolderSelection::Archive));
    assert_eq!(store.displayed_files()[0].id, old);

    store.select_folder(Some(FolderSelection::Favorites));
    assert!(store.displayed_files().is_empty());
}

#[test]
fn rename_and_delete_archived_file() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let file = store.create_file(&notes, "draft").unwrap();

    store.rename_folder(&notes, "Inbox").unwrap();
    store.rename_file(&file, "final").unwrap();
    assert_eq!(store.state().folder(&notes).unwrap().name, "Inbox");
    assert_eq!(file_names(&store, &notes), vec!["final"]);

    store.archive_file(&notes, &file).unwrap();
    store.rename_file(&file, "archived final").unwrap();
    assert_eq!(store.state().archived_files[0].name, "archived final");

    store.select_file(Some(file.clone()));
    store.delete_archived_file(&file).unwrap();
    assert!(store.state().archived_files.is_empty());
    assert!(store.state().selected_file.is_none());
    assert!(store.unarchive_file(&file).is_err());
}

#[test]
fn mutations_persist_and_rejections_do_not() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();

    let file = store.create_file(&notes, "a").unwrap();
    assert_eq!(repo.write_count(), 1);

    store.update_file_content(&file, "same").unwrap();
    store.update_file_content(&file, "same").unwrap();
    assert_eq!(repo.write_count(), 2);

    let _ = store.delete_file(&notes, &ItemId::from("missing"));
    let _ = store.archive_file(&notes, &ItemId::from("missing"));
    let _ = store.reorder_folders(5, 0);
    assert_eq!(repo.write_count(), 2);
}

#[test]
fn mixed_operation_sequence_keeps_ids_unique() {
    let repo = MemorySnapshotRepository::new();
    let mut store = FolderStore::open(&repo);
    let notes = notes_id();
    let work = store.create_folder("Work").unwrap();

    let mut files = Vec::new();
    for index in 0..6 {
        let folder = if index % 2 == 0 { &notes } else { &work };
        files.push(store.create_file(folder, format!("f{index}")).unwrap());
    }
    for file in files.iter().step_by(2) {
        store.archive_file(&notes, file).unwrap();
    }
    store.unarchive_file(&files[0]).unwrap();
    store.reorder_files(&work, 0, 2).unwrap();
    store.delete_folder(&work).unwrap();
    store.unarchive_file(&files[2]).unwrap();
    store.toggle_favorite(&files[2]).unwrap();

    assert_unique_ids(&store);
    assert_eq!(store.state().archived_files.len(), 1);
    assert_eq!(file_names(&store, &notes), vec!["f0", "f2"]);
}

#[test]
fn failed_save_leaves_state_and_storage_unchanged() {
    let mut store = FolderStore::open(FlakyRepository::new());
    let notes = notes_id();
    let kept = store.create_file(&notes, "kept").unwrap();
    let other = store.create_file(&notes, "other").unwrap();
    store.toggle_favorite(&kept).unwrap();
    store.select_folder(Some(FolderSelection::Folder(notes.clone())));
    store.select_file(Some(other.clone()));

    let before = store.state().clone();
    let stored = store.repository().inner.read_entry(SnapshotKey::Folders).unwrap();
    let writes = store.repository().inner.write_count();
    store.repository().failing.set(true);

    let err = store.create_folder("Work").unwrap_err();
    assert!(matches!(err, StoreError::Persist(_)));
    assert!(!err.is_not_found());
    assert!(matches!(
        store.archive_file(&notes, &other),
        Err(StoreError::Persist(_))
    ));
    assert!(matches!(
        store.toggle_favorite(&kept),
        Err(StoreError::Persist(_))
    ));
    assert!(matches!(
        store.delete_file(&notes, &other).ignore_not_found(),
        Err(StoreError::Persist(_))
    ));
    assert!(store.delete_folder(&notes).ignore_not_found().is_err());

    assert_eq!(store.state(), &before);
    assert_eq!(store.repository().inner.write_count(), writes);
    assert_eq!(
        store.repository().inner.read_entry(SnapshotKey::Folders).unwrap(),
        stored
    );

    store.repository().failing.set(false);
    store.archive_file(&notes, &other).unwrap();
    assert_eq!(store.state().folders.len(), 1);
    assert_eq!(store.state().archived_files.len(), 1);
    assert!(store.is_favorite(&kept));
}
