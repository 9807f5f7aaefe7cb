//! Edit-permission evaluation for content items.

use std::collections::HashSet;

use uuid::Uuid;

use crate::model::{ContentItem, ShareGrant};
use crate::visibility::Visibility;

/// May `user_id` edit the item's contents (questions, cards, links)?
///
/// Owners always may. Everyone else only on the shared tier, and only via
/// membership: either in the legacy single `group_id` or in a group holding
/// a share grant. Grant rows are checked against the caller's own groups
/// here rather than assumed pre-filtered upstream. Public items stay
/// world-readable but owner-editable.
pub fn can_edit(
    user_id: Uuid,
    item: &ContentItem,
    user_groups: &HashSet<Uuid>,
    grants: &[ShareGrant],
) -> bool {
    if item.owner_id == user_id {
        return true;
    }
    if Visibility::classify(item.visibility.as_deref()) != Visibility::Shared {
        return false;
    }
    let legacy_member = item.group_id.is_some_and(|g| user_groups.contains(&g));
    legacy_member || grants.iter().any(|g| user_groups.contains(&g.group_id))
}

/// Sharing settings stay owner-only even where members can edit contents;
/// a non-owner saving the settings form would resync the share list out
/// from under the owner.
pub fn can_manage_settings(user_id: Uuid, item: &ContentItem) -> bool {
    item.owner_id == user_id
}
