//! Table-backed content store. The deployed system delegated persistence
//! and row filtering to a managed backend; this store keeps the same
//! logical tables in memory, persists each as a JSON file under the data
//! directory, and applies the row scoping itself — a read never returns a
//! row the caller could not see, so no handler trusts pre-filtered input.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access;
use crate::error::{HubError, Result};
use crate::folders;
use crate::model::{
    ContentItem, ContentKind, Flashcard, Folder, Group, GroupMembership, Profile, QuizAttempt,
    QuizQuestion, ShareGrant, Tag,
};
use crate::quiz;
use crate::sharing::{self, SharePlan};
use crate::tags::{self, TagLink};
use crate::visibility::{ScopeFilter, Visibility};

#[cfg(test)]
mod tests;

/// List-page query: title substring, scope prefilter, tag intersection.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub scope: ScopeFilter,
    pub tags: HashSet<Uuid>,
    pub include_untagged: bool,
}

/// Fields of a content creation form.
#[derive(Clone, Debug)]
pub struct NewContent {
    pub title: String,
    pub visibility: Visibility,
    pub folder_id: Option<Uuid>,
    pub group_ids: Vec<Uuid>,
    pub external_url: Option<String>,
    pub preview_url: Option<String>,
}

/// Fields of the settings form: rename, refile, and re-share in one save.
#[derive(Clone, Debug)]
pub struct SettingsUpdate {
    pub title: String,
    pub visibility: Visibility,
    pub folder_id: Option<Uuid>,
    pub group_ids: Vec<Uuid>,
}

/// Outcome of a settings save, with the grant diff that was applied.
#[derive(Clone, Debug)]
pub struct AppliedSettings {
    pub item: ContentItem,
    pub added: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

#[derive(Clone, Debug)]
pub struct NewQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewCard {
    pub front: String,
    pub back: String,
}

/// Visible-row counts per content family.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Counts {
    pub documents: usize,
    pub flashcards: usize,
    pub quizzes: usize,
}

pub struct ContentStore {
    dir: PathBuf,
    content: HashMap<Uuid, ContentItem>,
    folders: HashMap<Uuid, Folder>,
    tags: HashMap<Uuid, Tag>,
    tag_links: HashMap<ContentKind, Vec<TagLink>>,
    shares: HashMap<ContentKind, Vec<ShareGrant>>,
    groups: HashMap<Uuid, Group>,
    memberships: Vec<GroupMembership>,
    profiles: HashMap<Uuid, Profile>,
    questions: HashMap<Uuid, QuizQuestion>,
    cards: HashMap<Uuid, Flashcard>,
    attempts: Vec<QuizAttempt>,
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut content = HashMap::new();
        for kind in ContentKind::ALL {
            let rows: Vec<ContentItem> = read_table(&dir, kind.table())?;
            for row in rows {
                content.insert(row.id, row);
            }
        }

        let folders = index_by_id(read_table::<Vec<Folder>>(&dir, "library_folders")?, |f| f.id);
        let tags = index_by_id(read_table::<Vec<Tag>>(&dir, "tags")?, |t| t.id);
        let groups = index_by_id(read_table::<Vec<Group>>(&dir, "groups")?, |g| g.id);
        let profiles = index_by_id(read_table::<Vec<Profile>>(&dir, "profiles")?, |p| p.id);
        let questions = index_by_id(read_table::<Vec<QuizQuestion>>(&dir, "quiz_questions")?, |q| q.id);
        let cards = index_by_id(read_table::<Vec<Flashcard>>(&dir, "flashcards")?, |c| c.id);
        let memberships = read_table(&dir, "group_memberships")?;
        let attempts = read_table(&dir, "quiz_attempts")?;

        let mut tag_links = HashMap::new();
        let mut shares = HashMap::new();
        for kind in ContentKind::ALL {
            let raw: Vec<Value> = read_table(&dir, kind.tag_table())?;
            tag_links.insert(kind, parse_tag_rows(kind, raw));
            let raw: Vec<Value> = read_table(&dir, kind.share_table())?;
            shares.insert(kind, parse_share_rows(kind, raw));
        }

        let store = Self {
            dir,
            content,
            folders,
            tags,
            tag_links,
            shares,
            groups,
            memberships,
            profiles,
            questions,
            cards,
            attempts,
        };
        info!(
            items = store.content.len(),
            folders = store.folders.len(),
            groups = store.groups.len(),
            "content store loaded"
        );
        Ok(store)
    }

    /// Directory where tables are persisted.
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    // ---- membership -----------------------------------------------------

    pub fn member_groups(&self, user: Uuid) -> HashSet<Uuid> {
        self.memberships
            .iter()
            .filter(|m| m.user_id == user)
            .map(|m| m.group_id)
            .collect()
    }

    pub fn is_member(&self, user: Uuid, group_id: Uuid) -> bool {
        self.memberships
            .iter()
            .any(|m| m.user_id == user && m.group_id == group_id)
    }

    fn grants_for(&self, kind: ContentKind, item_id: Uuid) -> Vec<ShareGrant> {
        self.shares[&kind]
            .iter()
            .filter(|g| g.item_id == item_id)
            .copied()
            .collect()
    }

    /// Group ids currently granted on an item.
    pub fn shared_group_ids(&self, kind: ContentKind, item_id: Uuid) -> Vec<Uuid> {
        self.grants_for(kind, item_id)
            .into_iter()
            .map(|g| g.group_id)
            .collect()
    }

    // ---- row scoping ----------------------------------------------------

    /// Row filtering the deployed backend enforced per-policy: owners see
    /// their rows, public rows are readable by anyone, shared rows only by
    /// members of a granted (or legacy) group.
    fn visible_to(&self, user: Uuid, item: &ContentItem) -> bool {
        if item.owner_id == user {
            return true;
        }
        match Visibility::classify(item.visibility.as_deref()) {
            Visibility::Public => true,
            Visibility::Private => false,
            Visibility::Shared => {
                let groups = self.member_groups(user);
                item.group_id.is_some_and(|g| groups.contains(&g))
                    || self
                        .grants_for(item.kind, item.id)
                        .iter()
                        .any(|g| groups.contains(&g.group_id))
            }
        }
    }

    pub fn can_edit(&self, user: Uuid, item: &ContentItem) -> bool {
        let groups = self.member_groups(user);
        let grants = self.grants_for(item.kind, item.id);
        access::can_edit(user, item, &groups, &grants)
    }

    // ---- content --------------------------------------------------------

    /// Fetch one visible row. Rows hidden from the caller read as absent,
    /// exactly like a row-filtered backend.
    pub fn get_content(&self, user: Uuid, kind: ContentKind, id: Uuid) -> Result<ContentItem> {
        self.content
            .get(&id)
            .filter(|item| item.kind == kind && self.visible_to(user, item))
            .cloned()
            .ok_or(HubError::NotFound("content item"))
    }

    /// Visible rows of one kind, newest first, filtered by the query.
    pub fn list_content(&self, user: Uuid, kind: ContentKind, query: &ListQuery) -> Vec<ContentItem> {
        let mut items: Vec<ContentItem> = self
            .content
            .values()
            .filter(|item| item.kind == kind && self.visible_to(user, item))
            .filter(|item| match &query.q {
                Some(q) if !q.trim().is_empty() => item
                    .title
                    .to_lowercase()
                    .contains(&q.trim().to_lowercase()),
                _ => true,
            })
            .filter(|item| query.scope.matches(item.visibility.as_deref()))
            .cloned()
            .collect();

        if !query.tags.is_empty() {
            let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
            let keep: HashSet<Uuid> = tags::filter_by_tags(
                &ids,
                &self.tag_links[&kind],
                &query.tags,
                query.include_untagged,
            )
            .into_iter()
            .collect();
            items.retain(|item| keep.contains(&item.id));
        }

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        items
    }

    pub fn create_content(
        &mut self,
        owner: Uuid,
        kind: ContentKind,
        new: NewContent,
    ) -> Result<ContentItem> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(HubError::Validation("title must not be empty".into()));
        }
        if kind == ContentKind::Documents
            && new.external_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(HubError::Validation("document link requires a URL".into()));
        }
        if let Some(folder_id) = new.folder_id {
            self.check_folder(owner, kind, folder_id)?;
        }
        let plan = sharing::plan_sync(new.visibility, &new.group_ids, &[])?;
        self.check_groups(owner, &plan.to_add)?;

        let item = ContentItem {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            owner_id: owner,
            visibility: Some(new.visibility.as_str().to_string()),
            folder_id: new.folder_id,
            group_id: None,
            created_at: Utc::now(),
            external_url: new.external_url,
            preview_url: new.preview_url,
        };
        self.content.insert(item.id, item.clone());
        self.apply_share_plan(kind, item.id, &plan);

        self.save_content(kind)?;
        self.save_shares(kind)?;
        debug!(id = %item.id, kind = kind.table(), "content created");
        Ok(item)
    }

    /// Owner-only settings save: title, folder, visibility, and the share
    /// grant sync in one step. Validation happens before any mutation. The
    /// legacy `group_id` column is cleared here and never repopulated.
    pub fn save_settings(
        &mut self,
        user: Uuid,
        kind: ContentKind,
        id: Uuid,
        update: SettingsUpdate,
    ) -> Result<AppliedSettings> {
        let current = self.get_content(user, kind, id)?;
        if !access::can_manage_settings(user, &current) {
            return Err(HubError::Forbidden);
        }
        let title = update.title.trim();
        if title.is_empty() {
            return Err(HubError::Validation("title must not be empty".into()));
        }
        if let Some(folder_id) = update.folder_id {
            self.check_folder(user, kind, folder_id)?;
        }
        let existing = self.shared_group_ids(kind, id);
        let plan = sharing::plan_sync(update.visibility, &update.group_ids, &existing)?;
        self.check_groups(user, &plan.to_add)?;

        let item = self
            .content
            .get_mut(&id)
            .ok_or(HubError::NotFound("content item"))?;
        item.title = title.to_string();
        item.visibility = Some(update.visibility.as_str().to_string());
        item.folder_id = update.folder_id;
        item.group_id = None;
        let item = item.clone();

        self.apply_share_plan(kind, id, &plan);
        self.save_content(kind)?;
        self.save_shares(kind)?;
        debug!(
            id = %id,
            added = plan.to_add.len(),
            removed = plan.to_remove.len(),
            "settings saved"
        );
        Ok(AppliedSettings {
            item,
            added: plan.to_add,
            removed: plan.to_remove,
        })
    }

    /// Owner-only hard delete, cascading to questions, cards, attempts,
    /// grants and tag links.
    pub fn delete_content(&mut self, user: Uuid, kind: ContentKind, id: Uuid) -> Result<()> {
        let item = self.get_content(user, kind, id)?;
        if item.owner_id != user {
            return Err(HubError::Forbidden);
        }
        self.content.remove(&id);
        self.questions.retain(|_, q| q.set_id != id);
        self.cards.retain(|_, c| c.set_id != id);
        self.attempts.retain(|a| a.set_id != id);
        self.shares.entry(kind).or_default().retain(|g| g.item_id != id);
        self.tag_links.entry(kind).or_default().retain(|l| l.item_id != id);

        self.save_content(kind)?;
        self.save_shares(kind)?;
        self.save_tag_links(kind)?;
        self.save_questions()?;
        self.save_cards()?;
        self.save_attempts()?;
        debug!(id = %id, kind = kind.table(), "content deleted");
        Ok(())
    }

    pub fn counts(&self, user: Uuid) -> Counts {
        let count = |kind: ContentKind| {
            self.content
                .values()
                .filter(|item| item.kind == kind && self.visible_to(user, item))
                .count()
        };
        Counts {
            documents: count(ContentKind::Documents),
            flashcards: count(ContentKind::Flashcards),
            quizzes: count(ContentKind::Quizzes),
        }
    }

    fn check_folder(&self, owner: Uuid, kind: ContentKind, folder_id: Uuid) -> Result<()> {
        let folder = self
            .folders
            .get(&folder_id)
            .ok_or(HubError::NotFound("folder"))?;
        if folder.owner_id != owner || folder.kind != kind {
            return Err(HubError::Validation("folder belongs to another scope".into()));
        }
        Ok(())
    }

    fn check_groups(&self, user: Uuid, group_ids: &[Uuid]) -> Result<()> {
        for group_id in group_ids {
            if !self.groups.contains_key(group_id) {
                return Err(HubError::NotFound("group"));
            }
            if !self.is_member(user, *group_id) {
                return Err(HubError::Validation(
                    "cannot share with a group you are not a member of".into(),
                ));
            }
        }
        Ok(())
    }

    fn apply_share_plan(&mut self, kind: ContentKind, item_id: Uuid, plan: &SharePlan) {
        let grants = self.shares.entry(kind).or_default();
        grants.retain(|g| g.item_id != item_id || !plan.to_remove.contains(&g.group_id));
        for group_id in &plan.to_add {
            grants.push(ShareGrant {
                group_id: *group_id,
                item_id,
            });
        }
    }

    // ---- folders --------------------------------------------------------

    pub fn create_folder(
        &mut self,
        owner: Uuid,
        kind: ContentKind,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HubError::Validation("folder name must not be empty".into()));
        }
        if let Some(parent_id) = parent_id {
            self.check_folder(owner, kind, parent_id)?;
        }
        let folder = Folder {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id,
            kind,
            owner_id: owner,
        };
        self.folders.insert(folder.id, folder.clone());
        self.save_folders()?;
        debug!(id = %folder.id, kind = kind.table(), "folder created");
        Ok(folder)
    }

    /// The caller's folders of one kind, name order.
    pub fn folders_for(&self, owner: Uuid, kind: ContentKind) -> Vec<Folder> {
        let mut out: Vec<Folder> = self
            .folders
            .values()
            .filter(|f| f.owner_id == owner && f.kind == kind)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Display paths for the folder ids referenced by a set of items.
    pub fn folder_paths(&self, ids: impl IntoIterator<Item = Uuid>) -> HashMap<Uuid, String> {
        folders::resolve_paths(&self.folders, ids)
    }

    // ---- tags -----------------------------------------------------------

    pub fn create_tag(&mut self, owner: Uuid, name: &str, color: Option<String>) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HubError::Validation("tag name must not be empty".into()));
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color,
            owner_id: owner,
        };
        self.tags.insert(tag.id, tag.clone());
        self.save_tags()?;
        Ok(tag)
    }

    pub fn list_tags(&self, owner: Uuid) -> Vec<Tag> {
        let mut out: Vec<Tag> = self
            .tags
            .values()
            .filter(|t| t.owner_id == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Tag ids linked to an item, link order.
    pub fn item_tags(&self, kind: ContentKind, item_id: Uuid) -> Vec<Uuid> {
        self.tag_links[&kind]
            .iter()
            .filter(|l| l.item_id == item_id)
            .map(|l| l.tag_id)
            .collect()
    }

    /// Replace an item's tag links with the given set (diff-based, edit
    /// permission required).
    pub fn set_item_tags(
        &mut self,
        user: Uuid,
        kind: ContentKind,
        item_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let item = self.get_content(user, kind, item_id)?;
        if !self.can_edit(user, &item) {
            return Err(HubError::Forbidden);
        }
        let wanted = sharing::unique(tag_ids);
        for tag_id in &wanted {
            if !self.tags.contains_key(tag_id) {
                return Err(HubError::NotFound("tag"));
            }
        }
        let keep: HashSet<Uuid> = wanted.iter().copied().collect();
        let links = self.tag_links.entry(kind).or_default();
        let current: HashSet<Uuid> = links
            .iter()
            .filter(|l| l.item_id == item_id)
            .map(|l| l.tag_id)
            .collect();
        links.retain(|l| l.item_id != item_id || keep.contains(&l.tag_id));
        for tag_id in wanted.iter().filter(|t| !current.contains(t)) {
            links.push(TagLink {
                tag_id: *tag_id,
                item_id,
            });
        }
        self.save_tag_links(kind)?;
        Ok(wanted)
    }

    // ---- groups & profiles ----------------------------------------------

    pub fn create_group(&mut self, owner: Uuid, name: &str) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HubError::Validation("group name must not be empty".into()));
        }
        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id: owner,
        };
        self.groups.insert(group.id, group.clone());
        self.memberships.push(GroupMembership {
            user_id: owner,
            group_id: group.id,
        });
        self.save_groups()?;
        self.save_memberships()?;
        debug!(id = %group.id, "group created");
        Ok(group)
    }

    pub fn join_group(&mut self, user: Uuid, group_id: Uuid) -> Result<()> {
        if !self.groups.contains_key(&group_id) {
            return Err(HubError::NotFound("group"));
        }
        if !self.is_member(user, group_id) {
            self.memberships.push(GroupMembership {
                user_id: user,
                group_id,
            });
            self.save_memberships()?;
        }
        Ok(())
    }

    /// Groups the caller belongs to, name order.
    pub fn groups_for(&self, user: Uuid) -> Vec<Group> {
        let member_of = self.member_groups(user);
        let mut out: Vec<Group> = self
            .groups
            .values()
            .filter(|g| member_of.contains(&g.id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn profile(&self, user: Uuid) -> Profile {
        self.profiles.get(&user).cloned().unwrap_or(Profile {
            id: user,
            active_group_id: None,
        })
    }

    pub fn set_active_group(&mut self, user: Uuid, group_id: Option<Uuid>) -> Result<Profile> {
        if let Some(group_id) = group_id {
            if !self.is_member(user, group_id) {
                return Err(HubError::Validation(
                    "active group must be one of your groups".into(),
                ));
            }
        }
        let profile = Profile {
            id: user,
            active_group_id: group_id,
        };
        self.profiles.insert(user, profile.clone());
        self.save_profiles()?;
        Ok(profile)
    }

    // ---- quiz questions & attempts --------------------------------------

    /// Questions of a visible quiz set, position order.
    pub fn questions(&self, user: Uuid, set_id: Uuid) -> Result<Vec<QuizQuestion>> {
        self.get_content(user, ContentKind::Quizzes, set_id)?;
        let mut out: Vec<QuizQuestion> = self
            .questions
            .values()
            .filter(|q| q.set_id == set_id)
            .cloned()
            .collect();
        out.sort_by_key(|q| q.position);
        Ok(out)
    }

    pub fn add_question(
        &mut self,
        user: Uuid,
        set_id: Uuid,
        new: NewQuestion,
    ) -> Result<QuizQuestion> {
        let item = self.get_content(user, ContentKind::Quizzes, set_id)?;
        if !self.can_edit(user, &item) {
            return Err(HubError::Forbidden);
        }
        validate_question(&new)?;
        let position = self
            .questions
            .values()
            .filter(|q| q.set_id == set_id)
            .map(|q| q.position + 1)
            .max()
            .unwrap_or(0);
        let question = QuizQuestion {
            id: Uuid::new_v4(),
            set_id,
            prompt: new.prompt.trim().to_string(),
            choices: new.choices,
            correct_index: new.correct_index,
            explanation: new.explanation,
            position,
        };
        self.questions.insert(question.id, question.clone());
        self.save_questions()?;
        Ok(question)
    }

    pub fn update_question(
        &mut self,
        user: Uuid,
        set_id: Uuid,
        question_id: Uuid,
        new: NewQuestion,
    ) -> Result<QuizQuestion> {
        let item = self.get_content(user, ContentKind::Quizzes, set_id)?;
        if !self.can_edit(user, &item) {
            return Err(HubError::Forbidden);
        }
        validate_question(&new)?;
        let question = self
            .questions
            .get_mut(&question_id)
            .filter(|q| q.set_id == set_id)
            .ok_or(HubError::NotFound("question"))?;
        question.prompt = new.prompt.trim().to_string();
        question.choices = new.choices;
        question.correct_index = new.correct_index;
        question.explanation = new.explanation;
        let question = question.clone();
        self.save_questions()?;
        Ok(question)
    }

    pub fn delete_question(&mut self, user: Uuid, set_id: Uuid, question_id: Uuid) -> Result<()> {
        let item = self.get_content(user, ContentKind::Quizzes, set_id)?;
        if !self.can_edit(user, &item) {
            return Err(HubError::Forbidden);
        }
        if !self
            .questions
            .get(&question_id)
            .is_some_and(|q| q.set_id == set_id)
        {
            return Err(HubError::NotFound("question"));
        }
        self.questions.remove(&question_id);
        self.save_questions()?;
        Ok(())
    }

    /// Score a submitted answer sheet server-side and persist the attempt.
    pub fn submit_attempt(
        &mut self,
        user: Uuid,
        set_id: Uuid,
        answers: &[Option<usize>],
    ) -> Result<QuizAttempt> {
        let questions = self.questions(user, set_id)?;
        if questions.is_empty() {
            return Err(HubError::Validation("quiz set has no questions".into()));
        }
        let (score, total) = quiz::score_answers(&questions, answers);
        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            set_id,
            user_id: user,
            score,
            total,
            created_at: Utc::now(),
        };
        self.attempts.push(attempt.clone());
        self.save_attempts()?;
        debug!(set = %set_id, score, total, "attempt recorded");
        Ok(attempt)
    }

    /// The caller's own attempts on a visible set, newest first.
    pub fn attempts(&self, user: Uuid, set_id: Uuid) -> Result<Vec<QuizAttempt>> {
        self.get_content(user, ContentKind::Quizzes, set_id)?;
        let mut out: Vec<QuizAttempt> = self
            .attempts
            .iter()
            .filter(|a| a.set_id == set_id && a.user_id == user)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    // ---- flashcards ------------------------------------------------------

    /// Cards of a visible flashcard set, position order.
    pub fn cards(&self, user: Uuid, set_id: Uuid) -> Result<Vec<Flashcard>> {
        self.get_content(user, ContentKind::Flashcards, set_id)?;
        let mut out: Vec<Flashcard> = self
            .cards
            .values()
            .filter(|c| c.set_id == set_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.position);
        Ok(out)
    }

    pub fn add_card(&mut self, user: Uuid, set_id: Uuid, new: NewCard) -> Result<Flashcard> {
        let item = self.get_content(user, ContentKind::Flashcards, set_id)?;
        if !self.can_edit(user, &item) {
            return Err(HubError::Forbidden);
        }
        if new.front.trim().is_empty() {
            return Err(HubError::Validation("card front must not be empty".into()));
        }
        let position = self
            .cards
            .values()
            .filter(|c| c.set_id == set_id)
            .map(|c| c.position + 1)
            .max()
            .unwrap_or(0);
        let card = Flashcard {
            id: Uuid::new_v4(),
            set_id,
            front: new.front.trim().to_string(),
            back: new.back.trim().to_string(),
            position,
        };
        self.cards.insert(card.id, card.clone());
        self.save_cards()?;
        Ok(card)
    }

    pub fn delete_card(&mut self, user: Uuid, set_id: Uuid, card_id: Uuid) -> Result<()> {
        let item = self.get_content(user, ContentKind::Flashcards, set_id)?;
        if !self.can_edit(user, &item) {
            return Err(HubError::Forbidden);
        }
        if !self.cards.get(&card_id).is_some_and(|c| c.set_id == set_id) {
            return Err(HubError::NotFound("card"));
        }
        self.cards.remove(&card_id);
        self.save_cards()?;
        Ok(())
    }

    // ---- persistence ----------------------------------------------------

    fn save_content(&self, kind: ContentKind) -> Result<()> {
        let mut rows: Vec<&ContentItem> = self
            .content
            .values()
            .filter(|item| item.kind == kind)
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        self.write_table(kind.table(), &rows)
    }

    fn save_folders(&self) -> Result<()> {
        let mut rows: Vec<&Folder> = self.folders.values().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        self.write_table("library_folders", &rows)
    }

    fn save_tags(&self) -> Result<()> {
        let mut rows: Vec<&Tag> = self.tags.values().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        self.write_table("tags", &rows)
    }

    fn save_groups(&self) -> Result<()> {
        let mut rows: Vec<&Group> = self.groups.values().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        self.write_table("groups", &rows)
    }

    fn save_memberships(&self) -> Result<()> {
        self.write_table("group_memberships", &self.memberships)
    }

    fn save_profiles(&self) -> Result<()> {
        let mut rows: Vec<&Profile> = self.profiles.values().collect();
        rows.sort_by_key(|p| p.id);
        self.write_table("profiles", &rows)
    }

    fn save_questions(&self) -> Result<()> {
        let mut rows: Vec<&QuizQuestion> = self.questions.values().collect();
        rows.sort_by(|a, b| a.set_id.cmp(&b.set_id).then(a.position.cmp(&b.position)));
        self.write_table("quiz_questions", &rows)
    }

    fn save_cards(&self) -> Result<()> {
        let mut rows: Vec<&Flashcard> = self.cards.values().collect();
        rows.sort_by(|a, b| a.set_id.cmp(&b.set_id).then(a.position.cmp(&b.position)));
        self.write_table("flashcards", &rows)
    }

    fn save_attempts(&self) -> Result<()> {
        self.write_table("quiz_attempts", &self.attempts)
    }

    fn save_shares(&self, kind: ContentKind) -> Result<()> {
        let rows: Vec<Value> = self.shares[&kind]
            .iter()
            .map(|g| {
                serde_json::json!({
                    "group_id": g.group_id,
                    (kind.share_fk()): g.item_id,
                })
            })
            .collect();
        self.write_table(kind.share_table(), &rows)
    }

    fn save_tag_links(&self, kind: ContentKind) -> Result<()> {
        let rows: Vec<Value> = self.tag_links[&kind]
            .iter()
            .map(|l| {
                serde_json::json!({
                    "tag_id": l.tag_id,
                    (kind.tag_fk()): l.item_id,
                })
            })
            .collect();
        self.write_table(kind.tag_table(), &rows)
    }

    fn write_table<T: Serialize>(&self, table: &str, rows: &T) -> Result<()> {
        let data = serde_json::to_string_pretty(rows)?;
        std::fs::write(self.dir.join(format!("{table}.json")), data)?;
        Ok(())
    }
}

fn validate_question(new: &NewQuestion) -> Result<()> {
    if new.prompt.trim().is_empty() {
        return Err(HubError::Validation("question prompt must not be empty".into()));
    }
    if new.choices.len() < 2 {
        return Err(HubError::Validation("question needs at least two choices".into()));
    }
    if new.correct_index >= new.choices.len() {
        return Err(HubError::Validation("correct choice is out of range".into()));
    }
    Ok(())
}

fn read_table<T: DeserializeOwned + Default>(dir: &Path, table: &str) -> Result<T> {
    let path = dir.join(format!("{table}.json"));
    if !path.exists() {
        return Ok(T::default());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn index_by_id<T>(rows: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> HashMap<Uuid, T> {
    rows.into_iter().map(|row| (id_of(&row), row)).collect()
}

fn parse_share_rows(kind: ContentKind, rows: Vec<Value>) -> Vec<ShareGrant> {
    rows.into_iter()
        .filter_map(|row| {
            let group_id = parse_uuid(row.get("group_id"))?;
            let item_id = parse_uuid(row.get(kind.share_fk()))?;
            Some(ShareGrant { group_id, item_id })
        })
        .collect()
}

fn parse_tag_rows(kind: ContentKind, rows: Vec<Value>) -> Vec<TagLink> {
    rows.into_iter()
        .filter_map(|row| {
            let tag_id = parse_uuid(row.get("tag_id"))?;
            let item_id = parse_uuid(row.get(kind.tag_fk()))?;
            Some(TagLink { tag_id, item_id })
        })
        .collect()
}

fn parse_uuid(value: Option<&Value>) -> Option<Uuid> {
    let raw = value?.as_str()?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(raw, "skipping row with malformed id");
            None
        }
    }
}
