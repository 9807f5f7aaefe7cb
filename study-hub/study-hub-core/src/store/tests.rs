use super::*;
use tempfile::TempDir;

fn setup() -> (ContentStore, TempDir) {
    let tmp = TempDir::new().unwrap();
    let store = ContentStore::new(tmp.path()).unwrap();
    (store, tmp)
}

fn private(title: &str) -> NewContent {
    NewContent {
        title: title.to_string(),
        visibility: Visibility::Private,
        folder_id: None,
        group_ids: Vec::new(),
        external_url: None,
        preview_url: None,
    }
}

fn doc(title: &str) -> NewContent {
    NewContent {
        external_url: Some("https://drive.example.com/a.pdf".to_string()),
        ..private(title)
    }
}

fn question() -> NewQuestion {
    NewQuestion {
        prompt: "Spot rate vs forward rate?".to_string(),
        choices: vec!["Same".into(), "Different".into()],
        correct_index: 1,
        explanation: None,
    }
}

#[test]
fn create_and_get_content() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();

    let item = store
        .create_content(owner, ContentKind::Quizzes, private("Ethics QCM"))
        .unwrap();
    let fetched = store.get_content(owner, ContentKind::Quizzes, item.id).unwrap();
    assert_eq!(fetched.title, "Ethics QCM");
    assert_eq!(fetched.visibility.as_deref(), Some("private"));

    // Wrong kind reads as absent.
    assert!(matches!(
        store.get_content(owner, ContentKind::Documents, item.id),
        Err(HubError::NotFound(_))
    ));
}

#[test]
fn documents_require_a_url_and_titles_must_be_non_empty() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();

    assert!(matches!(
        store.create_content(owner, ContentKind::Documents, private("Curriculum")),
        Err(HubError::Validation(_))
    ));
    assert!(matches!(
        store.create_content(owner, ContentKind::Quizzes, private("   ")),
        Err(HubError::Validation(_))
    ));
    assert!(store
        .create_content(owner, ContentKind::Documents, doc("Curriculum"))
        .is_ok());
}

#[test]
fn rows_are_scoped_to_the_caller() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let member = Uuid::new_v4();

    let group = store.create_group(owner, "Level II crew").unwrap();
    store.join_group(member, group.id).unwrap();

    let hidden = store
        .create_content(owner, ContentKind::Quizzes, private("Private set"))
        .unwrap();
    let open = store
        .create_content(
            owner,
            ContentKind::Quizzes,
            NewContent {
                visibility: Visibility::Public,
                ..private("Public set")
            },
        )
        .unwrap();
    let shared = store
        .create_content(
            owner,
            ContentKind::Quizzes,
            NewContent {
                visibility: Visibility::Shared,
                group_ids: vec![group.id],
                ..private("Shared set")
            },
        )
        .unwrap();

    // Private rows read as absent for everyone but the owner.
    assert!(store.get_content(stranger, ContentKind::Quizzes, hidden.id).is_err());
    assert!(store.get_content(owner, ContentKind::Quizzes, hidden.id).is_ok());

    // Public rows are readable by anyone, editable by the owner only.
    let fetched = store.get_content(stranger, ContentKind::Quizzes, open.id).unwrap();
    assert!(!store.can_edit(stranger, &fetched));
    assert!(store.can_edit(owner, &fetched));

    // Shared rows are visible and editable for members.
    assert!(store.get_content(stranger, ContentKind::Quizzes, shared.id).is_err());
    let fetched = store.get_content(member, ContentKind::Quizzes, shared.id).unwrap();
    assert!(store.can_edit(member, &fetched));
}

#[test]
fn legacy_group_column_still_grants_access() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let member = Uuid::new_v4();

    let group = store.create_group(owner, "G1").unwrap();
    store.join_group(member, group.id).unwrap();

    let item = store
        .create_content(owner, ContentKind::Quizzes, private("Old-style set"))
        .unwrap();
    // Simulate a never-migrated row: raw "group" visibility, single
    // group_id column, zero grant rows.
    {
        let row = store.content.get_mut(&item.id).unwrap();
        row.visibility = Some("group".to_string());
        row.group_id = Some(group.id);
    }

    assert!(store.shared_group_ids(ContentKind::Quizzes, item.id).is_empty());
    let fetched = store.get_content(member, ContentKind::Quizzes, item.id).unwrap();
    assert!(store.can_edit(member, &fetched));

    let outsider = Uuid::new_v4();
    assert!(store.get_content(outsider, ContentKind::Quizzes, item.id).is_err());
}

#[test]
fn list_content_applies_search_scope_and_tags() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();

    let ethics = store
        .create_content(owner, ContentKind::Flashcards, private("Ethics set"))
        .unwrap();
    store
        .create_content(owner, ContentKind::Flashcards, private("Quant set"))
        .unwrap();
    store
        .create_content(
            owner,
            ContentKind::Flashcards,
            NewContent {
                visibility: Visibility::Public,
                ..private("Ethics public")
            },
        )
        .unwrap();

    let all = store.list_content(owner, ContentKind::Flashcards, &ListQuery::default());
    assert_eq!(all.len(), 3);

    let hits = store.list_content(
        owner,
        ContentKind::Flashcards,
        &ListQuery {
            q: Some("ethics".to_string()),
            ..ListQuery::default()
        },
    );
    assert_eq!(hits.len(), 2);

    let hits = store.list_content(
        owner,
        ContentKind::Flashcards,
        &ListQuery {
            q: Some("ethics".to_string()),
            scope: ScopeFilter::Public,
            ..ListQuery::default()
        },
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Ethics public");

    let tag = store.create_tag(owner, "formulas", None).unwrap();
    store
        .set_item_tags(owner, ContentKind::Flashcards, ethics.id, &[tag.id])
        .unwrap();

    let hits = store.list_content(
        owner,
        ContentKind::Flashcards,
        &ListQuery {
            tags: HashSet::from([tag.id]),
            ..ListQuery::default()
        },
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ethics.id);

    let untagged = store.list_content(
        owner,
        ContentKind::Flashcards,
        &ListQuery {
            tags: HashSet::from([tags::UNTAGGED]),
            include_untagged: true,
            ..ListQuery::default()
        },
    );
    assert_eq!(untagged.len(), 2);
}

#[test]
fn settings_save_migrates_legacy_sharing_one_way() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();

    let g1 = store.create_group(owner, "G1").unwrap();
    let g2 = store.create_group(owner, "G2").unwrap();

    let item = store
        .create_content(owner, ContentKind::Quizzes, private("Migrating set"))
        .unwrap();
    {
        let row = store.content.get_mut(&item.id).unwrap();
        row.visibility = Some("group".to_string());
        row.group_id = Some(g1.id);
    }

    let applied = store
        .save_settings(
            owner,
            ContentKind::Quizzes,
            item.id,
            SettingsUpdate {
                title: "Migrating set".to_string(),
                visibility: Visibility::Shared,
                folder_id: None,
                group_ids: vec![g1.id, g2.id],
            },
        )
        .unwrap();

    // Only explicitly selected groups become grants; the legacy column is
    // cleared and never written again.
    assert_eq!(applied.added.len(), 2);
    assert!(applied.removed.is_empty());
    assert_eq!(applied.item.group_id, None);
    assert_eq!(applied.item.visibility.as_deref(), Some("groups"));
    let mut granted = store.shared_group_ids(ContentKind::Quizzes, item.id);
    granted.sort();
    let mut expected = vec![g1.id, g2.id];
    expected.sort();
    assert_eq!(granted, expected);
}

#[test]
fn settings_save_is_idempotent() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let group = store.create_group(owner, "G").unwrap();
    let item = store
        .create_content(owner, ContentKind::Documents, doc("Notes"))
        .unwrap();

    let update = SettingsUpdate {
        title: "Notes".to_string(),
        visibility: Visibility::Shared,
        folder_id: None,
        group_ids: vec![group.id],
    };
    let first = store
        .save_settings(owner, ContentKind::Documents, item.id, update.clone())
        .unwrap();
    assert_eq!(first.added, vec![group.id]);

    let second = store
        .save_settings(owner, ContentKind::Documents, item.id, update)
        .unwrap();
    assert!(second.added.is_empty());
    assert!(second.removed.is_empty());
}

#[test]
fn shared_with_no_groups_is_rejected_before_any_write() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let group = store.create_group(owner, "G").unwrap();
    let item = store
        .create_content(
            owner,
            ContentKind::Quizzes,
            NewContent {
                visibility: Visibility::Shared,
                group_ids: vec![group.id],
                ..private("Shared set")
            },
        )
        .unwrap();

    let err = store
        .save_settings(
            owner,
            ContentKind::Quizzes,
            item.id,
            SettingsUpdate {
                title: "Renamed anyway".to_string(),
                visibility: Visibility::Shared,
                folder_id: None,
                group_ids: Vec::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, HubError::Validation(_)));

    // Nothing was touched: neither the row nor the grants.
    let row = store.get_content(owner, ContentKind::Quizzes, item.id).unwrap();
    assert_eq!(row.title, "Shared set");
    assert_eq!(store.shared_group_ids(ContentKind::Quizzes, item.id), vec![group.id]);
}

#[test]
fn leaving_the_shared_tier_deletes_all_grants() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let group = store.create_group(owner, "G").unwrap();
    let item = store
        .create_content(
            owner,
            ContentKind::Quizzes,
            NewContent {
                visibility: Visibility::Shared,
                group_ids: vec![group.id],
                ..private("Shared set")
            },
        )
        .unwrap();

    let applied = store
        .save_settings(
            owner,
            ContentKind::Quizzes,
            item.id,
            SettingsUpdate {
                title: "Shared set".to_string(),
                visibility: Visibility::Private,
                folder_id: None,
                group_ids: Vec::new(),
            },
        )
        .unwrap();
    assert_eq!(applied.removed, vec![group.id]);
    assert!(store.shared_group_ids(ContentKind::Quizzes, item.id).is_empty());
}

#[test]
fn settings_are_owner_only() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let member = Uuid::new_v4();
    let group = store.create_group(owner, "G").unwrap();
    store.join_group(member, group.id).unwrap();

    let item = store
        .create_content(
            owner,
            ContentKind::Quizzes,
            NewContent {
                visibility: Visibility::Shared,
                group_ids: vec![group.id],
                ..private("Shared set")
            },
        )
        .unwrap();

    // The member can edit questions but not touch settings.
    let fetched = store.get_content(member, ContentKind::Quizzes, item.id).unwrap();
    assert!(store.can_edit(member, &fetched));
    let err = store
        .save_settings(
            member,
            ContentKind::Quizzes,
            item.id,
            SettingsUpdate {
                title: "Hijacked".to_string(),
                visibility: Visibility::Private,
                folder_id: None,
                group_ids: Vec::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, HubError::Forbidden));
}

#[test]
fn delete_cascades_to_dependents() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let group = store.create_group(owner, "G").unwrap();
    let tag = store.create_tag(owner, "hard", None).unwrap();

    let item = store
        .create_content(
            owner,
            ContentKind::Quizzes,
            NewContent {
                visibility: Visibility::Shared,
                group_ids: vec![group.id],
                ..private("Doomed set")
            },
        )
        .unwrap();
    store.add_question(owner, item.id, question()).unwrap();
    store.set_item_tags(owner, ContentKind::Quizzes, item.id, &[tag.id]).unwrap();
    store.submit_attempt(owner, item.id, &[Some(1)]).unwrap();

    store.delete_content(owner, ContentKind::Quizzes, item.id).unwrap();

    assert!(store.get_content(owner, ContentKind::Quizzes, item.id).is_err());
    assert!(store.questions.values().all(|q| q.set_id != item.id));
    assert!(store.attempts.iter().all(|a| a.set_id != item.id));
    assert!(store.shared_group_ids(ContentKind::Quizzes, item.id).is_empty());
    assert!(store.item_tags(ContentKind::Quizzes, item.id).is_empty());
}

#[test]
fn questions_are_edit_gated_and_attempts_scored_server_side() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let set = store
        .create_content(
            owner,
            ContentKind::Quizzes,
            NewContent {
                visibility: Visibility::Public,
                ..private("Open quiz")
            },
        )
        .unwrap();
    store.add_question(owner, set.id, question()).unwrap();
    store
        .add_question(
            owner,
            set.id,
            NewQuestion {
                prompt: "Second question".to_string(),
                choices: vec!["a".into(), "b".into(), "c".into()],
                correct_index: 0,
                explanation: Some("because".to_string()),
            },
        )
        .unwrap();

    // Public: anyone can read and attempt, only the owner edits.
    assert_eq!(store.questions(stranger, set.id).unwrap().len(), 2);
    assert!(matches!(
        store.add_question(stranger, set.id, question()),
        Err(HubError::Forbidden)
    ));

    let attempt = store
        .submit_attempt(stranger, set.id, &[Some(1), Some(2)])
        .unwrap();
    assert_eq!((attempt.score, attempt.total), (1, 2));

    let mine = store.attempts(stranger, set.id).unwrap();
    assert_eq!(mine.len(), 1);
    assert!(store.attempts(owner, set.id).unwrap().is_empty());
}

#[test]
fn folder_paths_resolve_for_item_references() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();

    let parent = store
        .create_folder(owner, ContentKind::Documents, "CFA", None)
        .unwrap();
    let child = store
        .create_folder(owner, ContentKind::Documents, "Ethics", Some(parent.id))
        .unwrap();

    let paths = store.folder_paths([child.id, Uuid::new_v4()]);
    assert_eq!(paths.get(&child.id).map(String::as_str), Some("CFA / Ethics"));
    assert_eq!(paths.len(), 1);

    // Folders are scoped by kind and owner.
    assert!(matches!(
        store.create_folder(owner, ContentKind::Quizzes, "Sub", Some(parent.id)),
        Err(HubError::Validation(_))
    ));
    let folders = store.folders_for(owner, ContentKind::Documents);
    assert_eq!(folders.len(), 2);
}

#[test]
fn tag_links_sync_as_a_diff() {
    let (mut store, _tmp) = setup();
    let owner = Uuid::new_v4();
    let a = store.create_tag(owner, "a", None).unwrap();
    let b = store.create_tag(owner, "b", None).unwrap();
    let c = store.create_tag(owner, "c", None).unwrap();

    let item = store
        .create_content(owner, ContentKind::Flashcards, private("Set"))
        .unwrap();

    store
        .set_item_tags(owner, ContentKind::Flashcards, item.id, &[a.id, b.id])
        .unwrap();
    store
        .set_item_tags(owner, ContentKind::Flashcards, item.id, &[b.id, c.id, c.id])
        .unwrap();

    let mut tags = store.item_tags(ContentKind::Flashcards, item.id);
    tags.sort();
    let mut expected = vec![b.id, c.id];
    expected.sort();
    assert_eq!(tags, expected);
}

#[test]
fn active_group_must_be_one_of_the_users_groups() {
    let (mut store, _tmp) = setup();
    let user = Uuid::new_v4();
    let group = store.create_group(user, "Mine").unwrap();

    assert!(store.set_active_group(user, Some(Uuid::new_v4())).is_err());
    let profile = store.set_active_group(user, Some(group.id)).unwrap();
    assert_eq!(profile.active_group_id, Some(group.id));
    assert_eq!(store.profile(user).active_group_id, Some(group.id));

    let other = Uuid::new_v4();
    assert_eq!(store.profile(other).active_group_id, None);
}

#[test]
fn tables_survive_a_reload_with_schema_column_names() {
    let tmp = TempDir::new().unwrap();
    let owner = Uuid::new_v4();
    let (set_id, group_id, tag_id) = {
        let mut store = ContentStore::new(tmp.path()).unwrap();
        let group = store.create_group(owner, "G").unwrap();
        let tag = store.create_tag(owner, "t", None).unwrap();
        let set = store
            .create_content(
                owner,
                ContentKind::Quizzes,
                NewContent {
                    visibility: Visibility::Shared,
                    group_ids: vec![group.id],
                    ..private("Durable set")
                },
            )
            .unwrap();
        store.set_item_tags(owner, ContentKind::Quizzes, set.id, &[tag.id]).unwrap();
        store.add_question(owner, set.id, question()).unwrap();
        (set.id, group.id, tag.id)
    };

    // The serialized join rows carry the kind-specific column names.
    let shares = std::fs::read_to_string(tmp.path().join("quiz_set_shares.json")).unwrap();
    assert!(shares.contains("\"set_id\""));
    let links = std::fs::read_to_string(tmp.path().join("quiz_set_tags.json")).unwrap();
    assert!(links.contains("\"quiz_set_id\""));

    let store = ContentStore::new(tmp.path()).unwrap();
    let item = store.get_content(owner, ContentKind::Quizzes, set_id).unwrap();
    assert_eq!(item.title, "Durable set");
    assert_eq!(store.shared_group_ids(ContentKind::Quizzes, set_id), vec![group_id]);
    assert_eq!(store.item_tags(ContentKind::Quizzes, set_id), vec![tag_id]);
    assert_eq!(store.questions(owner, set_id).unwrap().len(), 1);
}
