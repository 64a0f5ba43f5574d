//! Read-side projections over store state.
//!
//! # Invariants
//! - Every projection is a pure function of its inputs; nothing is cached.
//! - Projections never fail; unresolved references read as absent.

use crate::model::item::{File, Folder, FolderSelection, ItemId};
use crate::model::state::StoreState;
use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|blockquote)\s*>").expect("valid break regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Resolves the file the editor should show.
///
/// The collection searched depends on the folder selection: the archive,
/// the favorite references, or the flattened folder contents.
pub fn resolve_selected_file(state: &StoreState) -> Option<&File> {
    let file_id = state.selected_file.as_ref()?;
    match state.selected_folder {
        Some(FolderSelection::Archive) => state.archived_file(file_id),
        Some(FolderSelection::Favorites) => state.favorite_file(file_id),
        Some(FolderSelection::Folder(_)) | None => state.live_file(file_id),
    }
}

/// Files listed for the current folder selection.
///
/// Favorite references that no longer resolve are skipped.
pub fn displayed_files<'a>(
    selection: Option<&FolderSelection>,
    folders: &'a [Folder],
    favorites: &[ItemId],
    archived_files: &'a [File],
) -> Vec<&'a File> {
    match selection {
        Some(FolderSelection::Favorites) => favorites
            .iter()
            .filter_map(|id| find_file(id, folders, archived_files))
            .collect(),
        Some(FolderSelection::Archive) => archived_files.iter().collect(),
        Some(FolderSelection::Folder(folder_id)) => folders
            .iter()
            .find(|folder| &folder.id == folder_id)
            .map(|folder| folder.files.iter().collect())
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

/// Builds a single-line plain-text summary of a rich-text blob.
///
/// Tags are stripped, common entities decoded, whitespace collapsed, and
/// the result capped at `max_chars` with a trailing `...`.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let spaced = BLOCK_BREAK_RE.replace_all(content, " ");
    let stripped = TAG_RE.replace_all(&spaced, "");
    let decoded = decode_entities(&stripped);
    let collapsed = WHITESPACE_RE.replace_all(decoded.trim(), " ");

    let mut preview = collapsed.chars().take(max_chars).collect::<String>();
    if collapsed.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}

fn find_file<'a>(
    file_id: &ItemId,
    folders: &'a [Folder],
    archived_files: &'a [File],
) -> Option<&'a File> {
    folders
        .iter()
        .flat_map(|folder| folder.files.iter())
        .chain(archived_files.iter())
        .find(|file| &file.id == file_id)
}

fn decode_entities(value: &str) -> String {
    // `&amp;` last so `&amp;lt;` stays literal `&lt;`.
    value
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
