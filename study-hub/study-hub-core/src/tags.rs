//! Tag filtering over already-fetched join rows. Matching is intersection:
//! an item qualifies only when it carries every requested tag.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// Sentinel tag id meaning "items with no tags at all".
pub const UNTAGGED: Uuid = Uuid::nil();

/// Join row linking a tag to a content item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagLink {
    pub tag_id: Uuid,
    pub item_id: Uuid,
}

/// Intersection filter. An empty request matches everything. Requesting
/// [`UNTAGGED`] with `include_untagged` and no concrete tags selects items
/// with zero links instead; combined with concrete tags the sentinel is
/// ignored. Duplicate join rows are tolerated.
pub fn filter_by_tags(
    item_ids: &[Uuid],
    links: &[TagLink],
    required: &HashSet<Uuid>,
    include_untagged: bool,
) -> Vec<Uuid> {
    let concrete: HashSet<Uuid> = required
        .iter()
        .copied()
        .filter(|tag| *tag != UNTAGGED)
        .collect();

    if concrete.is_empty() {
        if required.contains(&UNTAGGED) && include_untagged {
            let tagged: HashSet<Uuid> = links.iter().map(|l| l.item_id).collect();
            return item_ids
                .iter()
                .copied()
                .filter(|id| !tagged.contains(id))
                .collect();
        }
        return item_ids.to_vec();
    }

    let mut matched: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for link in links {
        if concrete.contains(&link.tag_id) {
            matched.entry(link.item_id).or_default().insert(link.tag_id);
        }
    }

    item_ids
        .iter()
        .copied()
        .filter(|id| matched.get(id).map_or(0, HashSet::len) == concrete.len())
        .collect()
}
