//! Ordered-sequence move helper shared by folder and file reordering.
//!
//! # Invariants
//! - A move is one "remove at `source`, insert at `target`" step.
//! - `target` is interpreted after removal and clamps to the end.

/// Moves the element at `source` so that it ends up at `target`.
///
/// Returns `false` (and leaves `items` untouched) when `source` is out of
/// range.
pub fn move_item<T>(items: &mut Vec<T>, source: usize, target: usize) -> bool {
    if source >= items.len() {
        return false;
    }
    let item = items.remove(source);
    let target = target.min(items.len());
    items.insert(target, item);
    true
}
