//! Folder display paths. Items reference a leaf folder; the resolver walks
//! `parent_id` links upward and renders the chain root-to-leaf.

use std::collections::HashMap;

use uuid::Uuid;

use crate::model::Folder;

/// Ancestor traversal bound. The schema is expected to keep the tree
/// acyclic, but the walk never relies on that: past this depth the path is
/// truncated instead of looping.
pub const MAX_FOLDER_DEPTH: usize = 64;

pub const PATH_SEPARATOR: &str = " / ";

/// Build display paths for each requested folder id. Ids missing from
/// `folders` (dangling references on content rows) are omitted; callers
/// render those items under their root label.
pub fn resolve_paths(
    folders: &HashMap<Uuid, Folder>,
    ids: impl IntoIterator<Item = Uuid>,
) -> HashMap<Uuid, String> {
    let mut paths = HashMap::new();
    for id in ids {
        if let Some(path) = display_path(folders, id) {
            paths.insert(id, path);
        }
    }
    paths
}

/// Root-to-leaf name chain for one folder, joined by [`PATH_SEPARATOR`].
/// `None` when the leaf id itself is dangling. A broken ancestor link
/// truncates the chain at the last known folder.
pub fn display_path(folders: &HashMap<Uuid, Folder>, id: Uuid) -> Option<String> {
    let leaf = folders.get(&id)?;
    let mut segments = vec![leaf.name.as_str()];
    let mut current = leaf.parent_id;
    while let Some(parent_id) = current {
        if segments.len() >= MAX_FOLDER_DEPTH {
            break;
        }
        let Some(parent) = folders.get(&parent_id) else {
            break;
        };
        segments.push(parent.name.as_str());
        current = parent.parent_id;
    }
    segments.reverse();
    Some(segments.join(PATH_SEPARATOR))
}
