//! HTTP API layer exposing the hub's CRUD and listing endpoints.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use study_hub_core::auth::TokenVerifier;
use study_hub_core::error::HubError;
use study_hub_core::events::{Event, EventBus};
use study_hub_core::model::{ContentItem, ContentKind, Flashcard, Folder, Group, Profile, QuizAttempt, QuizQuestion, Tag};
use study_hub_core::presenter;
use study_hub_core::store::{
    ContentStore, Counts, ListQuery, NewCard, NewContent, NewQuestion, SettingsUpdate,
};
use study_hub_core::tags::UNTAGGED;
use study_hub_core::visibility::{ScopeFilter, Visibility};

const DEFAULT_ROOT_LABEL: &str = "No folder";

/// Authentication context extracted from request headers.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        if let Some(auth) = headers.get("Authorization").and_then(|v| v.to_str().ok()) {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                if let Some(claims) = state.verifier.verify(token).await {
                    if let Ok(user_id) = Uuid::parse_str(&claims.sub) {
                        return Ok(Self { user_id });
                    }
                }
            }
        }
        headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(|user_id| Self { user_id })
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<ContentStore>>,
    pub events: EventBus,
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Domain error carried out of a handler. Validation errors surface before
/// any mutation; nothing here ever crashes the response cycle.
pub struct ApiError(HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            HubError::Validation(_) => StatusCode::BAD_REQUEST,
            HubError::Forbidden => StatusCode::FORBIDDEN,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Io(_) | HubError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

fn parse_kind(raw: &str) -> Result<ContentKind, ApiError> {
    ContentKind::parse(raw).ok_or(ApiError(HubError::NotFound("content kind")))
}

#[derive(Deserialize)]
struct CreateContentRequest {
    title: String,
    visibility: Option<String>,
    folder_id: Option<Uuid>,
    #[serde(default)]
    group_ids: Vec<Uuid>,
    external_url: Option<String>,
    preview_url: Option<String>,
}

#[derive(Deserialize)]
struct SettingsRequest {
    title: String,
    visibility: Option<String>,
    folder_id: Option<Uuid>,
    #[serde(default)]
    group_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
struct ListParams {
    q: Option<String>,
    scope: Option<String>,
    /// Comma-separated tag ids; the literal `untagged` requests items
    /// with no tags at all.
    tags: Option<String>,
    #[serde(default)]
    untagged: bool,
    root: Option<String>,
}

#[derive(Deserialize)]
struct FolderCreateRequest {
    name: String,
    kind: String,
    parent_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct FolderListParams {
    kind: String,
}

#[derive(Deserialize)]
struct TagCreateRequest {
    name: String,
    color: Option<String>,
}

#[derive(Deserialize)]
struct GroupCreateRequest {
    name: String,
}

#[derive(Deserialize)]
struct ActiveGroupRequest {
    group_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct SetTagsRequest {
    #[serde(default)]
    tag_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
struct QuestionRequest {
    prompt: String,
    choices: Vec<String>,
    correct_index: usize,
    explanation: Option<String>,
}

#[derive(Deserialize)]
struct CardRequest {
    front: String,
    back: String,
}

#[derive(Deserialize)]
struct AttemptRequest {
    /// One entry per question in position order; `null` for unanswered.
    answers: Vec<Option<usize>>,
}

#[derive(Serialize)]
struct ItemView {
    id: Uuid,
    title: String,
    visibility: Visibility,
    folder_id: Option<Uuid>,
    folder_path: Option<String>,
    tags: Vec<Uuid>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview_url: Option<String>,
}

#[derive(Serialize)]
struct FolderBlockView {
    label: String,
    items: Vec<ItemView>,
}

#[derive(Serialize)]
struct SectionView {
    count: usize,
    folders: Vec<FolderBlockView>,
}

#[derive(Serialize)]
struct ListResponse {
    total: usize,
    private: SectionView,
    shared: SectionView,
    public: SectionView,
}

#[derive(Serialize)]
struct DetailResponse {
    item: ItemView,
    owner_id: Uuid,
    can_edit: bool,
    /// Present for the owner only: current grants plus the legacy single
    /// group, so clients can preselect it when migrating.
    #[serde(skip_serializing_if = "Option::is_none")]
    shared_group_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    legacy_group_id: Option<Uuid>,
}

#[derive(Serialize)]
struct ProfileResponse {
    id: Uuid,
    active_group_id: Option<Uuid>,
    groups: Vec<Group>,
}

pub fn router(
    store: Arc<RwLock<ContentStore>>,
    events: EventBus,
    verifier: Arc<dyn TokenVerifier>,
) -> Router {
    let app_state = AppState {
        store,
        events,
        verifier,
    };
    Router::new()
        .route("/me", get(me))
        .route("/me/active-group", put(set_active_group))
        .route("/counts", get(counts))
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}/join", post(join_group))
        .route("/folders", get(list_folders).post(create_folder))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/content/{kind}", get(list_content).post(create_content))
        .route(
            "/content/{kind}/{id}",
            get(get_content).delete(delete_content),
        )
        .route("/content/{kind}/{id}/settings", put(save_settings))
        .route("/content/{kind}/{id}/tags", put(set_item_tags))
        .route(
            "/content/quizzes/{id}/questions",
            get(list_questions).post(add_question),
        )
        .route(
            "/content/quizzes/{id}/questions/{qid}",
            put(update_question).delete(delete_question),
        )
        .route(
            "/content/quizzes/{id}/attempts",
            get(list_attempts).post(submit_attempt),
        )
        .route(
            "/content/flashcards/{id}/cards",
            get(list_cards).post(add_card),
        )
        .route("/content/flashcards/{id}/cards/{cid}", delete(delete_card))
        .with_state(app_state)
}

// ---- profile & groups ----------------------------------------------------

async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Json<ProfileResponse> {
    let store = state.store.read().await;
    let profile = store.profile(auth.user_id);
    let groups = store.groups_for(auth.user_id);
    Json(ProfileResponse {
        id: profile.id,
        active_group_id: profile.active_group_id,
        groups,
    })
}

async fn set_active_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ActiveGroupRequest>,
) -> Result<Json<Profile>, ApiError> {
    let mut store = state.store.write().await;
    let profile = store.set_active_group(auth.user_id, req.group_id)?;
    Ok(Json(profile))
}

async fn counts(State(state): State<AppState>, auth: AuthContext) -> Json<Counts> {
    let store = state.store.read().await;
    Json(store.counts(auth.user_id))
}

async fn list_groups(State(state): State<AppState>, auth: AuthContext) -> Json<Vec<Group>> {
    let store = state.store.read().await;
    Json(store.groups_for(auth.user_id))
}

async fn create_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<GroupCreateRequest>,
) -> Result<Json<Group>, ApiError> {
    let mut store = state.store.write().await;
    let group = store.create_group(auth.user_id, &req.name)?;
    Ok(Json(group))
}

async fn join_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    store.join_group(auth.user_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- folders & tags ------------------------------------------------------

async fn list_folders(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<FolderListParams>,
) -> Result<Json<Vec<Folder>>, ApiError> {
    let kind = parse_kind(&params.kind)?;
    let store = state.store.read().await;
    Ok(Json(store.folders_for(auth.user_id, kind)))
}

async fn create_folder(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<FolderCreateRequest>,
) -> Result<Json<Folder>, ApiError> {
    let kind = parse_kind(&req.kind)?;
    let mut store = state.store.write().await;
    let folder = store.create_folder(auth.user_id, kind, &req.name, req.parent_id)?;
    Ok(Json(folder))
}

async fn list_tags(State(state): State<AppState>, auth: AuthContext) -> Json<Vec<Tag>> {
    let store = state.store.read().await;
    Json(store.list_tags(auth.user_id))
}

async fn create_tag(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<TagCreateRequest>,
) -> Result<Json<Tag>, ApiError> {
    let mut store = state.store.write().await;
    let tag = store.create_tag(auth.user_id, &req.name, req.color)?;
    Ok(Json(tag))
}

// ---- content -------------------------------------------------------------

async fn create_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kind): Path<String>,
    Json(req): Json<CreateContentRequest>,
) -> Result<Json<DetailResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let mut store = state.store.write().await;
    let item = store.create_content(
        auth.user_id,
        kind,
        NewContent {
            title: req.title,
            visibility: Visibility::classify(req.visibility.as_deref()),
            folder_id: req.folder_id,
            group_ids: req.group_ids,
            external_url: req.external_url,
            preview_url: req.preview_url,
        },
    )?;
    let detail = detail_of(&store, auth.user_id, &item);
    drop(store);
    state.events.send(Event::Created { id: detail.item.id });
    Ok(Json(detail))
}

async fn list_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kind): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let (tag_filter, saw_untagged) = parse_tag_filter(params.tags.as_deref())?;
    let query = ListQuery {
        q: params.q,
        scope: ScopeFilter::normalize(params.scope.as_deref()),
        tags: if params.untagged {
            let mut tags = tag_filter;
            tags.insert(UNTAGGED);
            tags
        } else {
            tag_filter
        },
        include_untagged: params.untagged || saw_untagged,
    };
    let root_label = params.root.unwrap_or_else(|| DEFAULT_ROOT_LABEL.to_string());

    let store = state.store.read().await;
    let items = store.list_content(auth.user_id, kind, &query);
    let folder_ids: HashSet<Uuid> = items.iter().filter_map(|i| i.folder_id).collect();
    let paths = store.folder_paths(folder_ids);
    let views: Vec<ItemView> = items
        .into_iter()
        .map(|item| item_view(&store, item, &paths))
        .collect();
    drop(store);

    let total = views.len();
    let sections = presenter::split_sections(views, |v| v.visibility);
    Ok(Json(ListResponse {
        total,
        private: section_view(sections.private, &root_label),
        shared: section_view(sections.shared, &root_label),
        public: section_view(sections.public, &root_label),
    }))
}

async fn get_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<DetailResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let store = state.store.read().await;
    let item = store.get_content(auth.user_id, kind, id)?;
    Ok(Json(detail_of(&store, auth.user_id, &item)))
}

async fn save_settings(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<DetailResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let mut store = state.store.write().await;
    let applied = store.save_settings(
        auth.user_id,
        kind,
        id,
        SettingsUpdate {
            title: req.title,
            visibility: Visibility::classify(req.visibility.as_deref()),
            folder_id: req.folder_id,
            group_ids: req.group_ids,
        },
    )?;
    let detail = detail_of(&store, auth.user_id, &applied.item);
    drop(store);

    state.events.send(Event::Updated { id });
    for group_id in applied.added {
        state.events.send(Event::Shared { id, group_id });
    }
    for group_id in applied.removed {
        state.events.send(Event::Unshared { id, group_id });
    }
    Ok(Json(detail))
}

async fn set_item_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<SetTagsRequest>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let mut store = state.store.write().await;
    let tags = store.set_item_tags(auth.user_id, kind, id, &req.tag_ids)?;
    drop(store);
    state.events.send(Event::Updated { id });
    Ok(Json(tags))
}

async fn delete_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    let mut store = state.store.write().await;
    store.delete_content(auth.user_id, kind, id)?;
    drop(store);
    state.events.send(Event::Deleted { id });
    Ok(StatusCode::NO_CONTENT)
}

// ---- quiz ----------------------------------------------------------------

async fn list_questions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuizQuestion>>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.questions(auth.user_id, id)?))
}

async fn add_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuizQuestion>, ApiError> {
    let mut store = state.store.write().await;
    let question = store.add_question(
        auth.user_id,
        id,
        NewQuestion {
            prompt: req.prompt,
            choices: req.choices,
            correct_index: req.correct_index,
            explanation: req.explanation,
        },
    )?;
    drop(store);
    state.events.send(Event::Updated { id });
    Ok(Json(question))
}

async fn update_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, qid)): Path<(Uuid, Uuid)>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuizQuestion>, ApiError> {
    let mut store = state.store.write().await;
    let question = store.update_question(
        auth.user_id,
        id,
        qid,
        NewQuestion {
            prompt: req.prompt,
            choices: req.choices,
            correct_index: req.correct_index,
            explanation: req.explanation,
        },
    )?;
    drop(store);
    state.events.send(Event::Updated { id });
    Ok(Json(question))
}

async fn delete_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, qid)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    store.delete_question(auth.user_id, id, qid)?;
    drop(store);
    state.events.send(Event::Updated { id });
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_attempt(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<AttemptRequest>,
) -> Result<Json<QuizAttempt>, ApiError> {
    let mut store = state.store.write().await;
    let attempt = store.submit_attempt(auth.user_id, id, &req.answers)?;
    Ok(Json(attempt))
}

async fn list_attempts(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuizAttempt>>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.attempts(auth.user_id, id)?))
}

// ---- flashcards ----------------------------------------------------------

async fn list_cards(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Flashcard>>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.cards(auth.user_id, id)?))
}

async fn add_card(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<CardRequest>,
) -> Result<Json<Flashcard>, ApiError> {
    let mut store = state.store.write().await;
    let card = store.add_card(
        auth.user_id,
        id,
        NewCard {
            front: req.front,
            back: req.back,
        },
    )?;
    drop(store);
    state.events.send(Event::Updated { id });
    Ok(Json(card))
}

async fn delete_card(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, cid)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    store.delete_card(auth.user_id, id, cid)?;
    drop(store);
    state.events.send(Event::Updated { id });
    Ok(StatusCode::NO_CONTENT)
}

// ---- view building -------------------------------------------------------

fn parse_tag_filter(raw: Option<&str>) -> Result<(HashSet<Uuid>, bool), ApiError> {
    let mut tags = HashSet::new();
    let mut saw_untagged = false;
    if let Some(raw) = raw {
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("untagged") {
                tags.insert(UNTAGGED);
                saw_untagged = true;
            } else {
                let id = Uuid::parse_str(token).map_err(|_| {
                    ApiError(HubError::Validation(format!("invalid tag id: {token}")))
                })?;
                tags.insert(id);
            }
        }
    }
    Ok((tags, saw_untagged))
}

fn item_view(store: &ContentStore, item: ContentItem, paths: &HashMap<Uuid, String>) -> ItemView {
    let folder_path = item.folder_id.and_then(|id| paths.get(&id).cloned());
    ItemView {
        id: item.id,
        title: item.title,
        visibility: Visibility::classify(item.visibility.as_deref()),
        folder_id: item.folder_id,
        folder_path,
        tags: store.item_tags(item.kind, item.id),
        created_at: item.created_at,
        external_url: item.external_url,
        preview_url: item.preview_url,
    }
}

fn section_view(items: Vec<ItemView>, root_label: &str) -> SectionView {
    let count = items.len();
    let folders = presenter::group_by_folder(items, root_label, |v| v.folder_path.clone())
        .into_iter()
        .map(|(label, items)| FolderBlockView { label, items })
        .collect();
    SectionView { count, folders }
}

fn detail_of(store: &ContentStore, user_id: Uuid, item: &ContentItem) -> DetailResponse {
    let paths = store.folder_paths(item.folder_id);
    let is_owner = item.owner_id == user_id;
    DetailResponse {
        owner_id: item.owner_id,
        can_edit: store.can_edit(user_id, item),
        shared_group_ids: is_owner.then(|| store.shared_group_ids(item.kind, item.id)),
        legacy_group_id: if is_owner { item.group_id } else { None },
        item: item_view(store, item.clone(), &paths),
    }
}
