//! Row types mirroring the deployed schema. Table and join-column names are
//! load-bearing for compatibility and must not drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three content families managed by the hub.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Documents,
    Flashcards,
    Quizzes,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Documents,
        ContentKind::Flashcards,
        ContentKind::Quizzes,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Documents => "documents",
            ContentKind::Flashcards => "flashcard_sets",
            ContentKind::Quizzes => "quiz_sets",
        }
    }

    pub fn share_table(&self) -> &'static str {
        match self {
            ContentKind::Documents => "document_shares",
            ContentKind::Flashcards => "flashcard_set_shares",
            ContentKind::Quizzes => "quiz_set_shares",
        }
    }

    pub fn tag_table(&self) -> &'static str {
        match self {
            ContentKind::Documents => "document_tags",
            ContentKind::Flashcards => "flashcard_set_tags",
            ContentKind::Quizzes => "quiz_set_tags",
        }
    }

    /// Foreign-key column naming the content row in its share table.
    /// Flashcard and quiz sets both kept the historical `set_id` name.
    pub fn share_fk(&self) -> &'static str {
        match self {
            ContentKind::Documents => "document_id",
            ContentKind::Flashcards => "set_id",
            ContentKind::Quizzes => "set_id",
        }
    }

    /// Foreign-key column naming the content row in its tag join table.
    pub fn tag_fk(&self) -> &'static str {
        match self {
            ContentKind::Documents => "document_id",
            ContentKind::Flashcards => "set_id",
            ContentKind::Quizzes => "quiz_set_id",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Documents => "documents",
            ContentKind::Flashcards => "flashcards",
            ContentKind::Quizzes => "quizzes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "documents" => Some(ContentKind::Documents),
            "flashcards" => Some(ContentKind::Flashcards),
            "quizzes" => Some(ContentKind::Quizzes),
            _ => None,
        }
    }
}

/// A flashcard set, document link, or quiz set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub owner_id: Uuid,
    /// Raw stored visibility value. Legacy rows may hold `"group"`, null or
    /// junk; always read through `Visibility::classify`.
    pub visibility: Option<String>,
    pub folder_id: Option<Uuid>,
    /// Legacy single-group sharing column. Read for access checks, cleared
    /// on the first settings save, never written otherwise.
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// `library_folders` row. `parent_id` links form a tree; acyclicity is a
/// schema-level expectation the path resolver does not rely on. The `kind`
/// column scopes a folder to one content family.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub kind: ContentKind,
    pub owner_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub owner_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
}

/// `group_memberships` row.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMembership {
    pub user_id: Uuid,
    pub group_id: Uuid,
}

/// Share grant pairing a content row with a group. Serialized under the
/// kind-specific foreign-key column name at the table boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShareGrant {
    pub group_id: Uuid,
    pub item_id: Uuid,
}

/// Per-user settings. The active group preselects sharing pickers; it is
/// passed to callers explicitly rather than living in ambient state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub active_group_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub set_id: Uuid,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub position: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub set_id: Uuid,
    pub front: String,
    pub back: String,
    pub position: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub set_id: Uuid,
    pub user_id: Uuid,
    pub score: u32,
    pub total: u32,
    pub created_at: DateTime<Utc>,
}
