//! Mutating actions reject unauthorized callers before touching the store.

mod common;

use std::sync::atomic::Ordering;

use uuid::Uuid;
use waypoint_actions::{CatalogSource, PathUpdate, RecordForm, RecordUpdate, UploadForm};
use waypoint_core::{
    Error, RecordKind, RefScope, Role, TagIntent, UpdateTaskRequest, UpsertTaskRequest,
};

use common::{admin, employee, harness, trainer, viewer, Harness};

fn assert_rejected<T: std::fmt::Debug>(result: waypoint_core::Result<T>, expect_unauthorized: bool) {
    match result {
        Err(Error::Unauthorized(_)) if expect_unauthorized => {}
        Err(Error::Forbidden(_)) if !expect_unauthorized => {}
        other => panic!("expected rejection, got {:?}", other),
    }
}

/// Invoke every mutating action once and check each is rejected.
async fn run_every_mutation(h: &Harness, expect_unauthorized: bool) {
    let p = &h.portal;
    let id = Uuid::new_v4();

    assert_rejected(
        p.create_record(
            RecordKind::Document,
            RecordForm {
                title: "Policy".into(),
                path: "https://intranet.example/p.pdf".into(),
                tags: TagIntent::keep(),
            },
        )
        .await,
        expect_unauthorized,
    );
    assert_rejected(
        p.update_record(
            id,
            RecordUpdate {
                title: Some("x".into()),
                ..Default::default()
            },
        )
        .await,
        expect_unauthorized,
    );
    assert_rejected(p.delete_record(id).await, expect_unauthorized);
    assert_rejected(
        p.upload_record(
            RecordKind::Upload,
            UploadForm {
                filename: "guide.pdf".into(),
                bytes: b"%PDF-1.7".to_vec(),
                ..Default::default()
            },
        )
        .await,
        expect_unauthorized,
    );
    assert_rejected(
        p.import_records_csv(RecordKind::Presentation, "Deck,https://x/d.pptx", TagIntent::keep())
            .await,
        expect_unauthorized,
    );
    assert_rejected(
        p.import_manuals_from_urls("https://x/manual", TagIntent::keep())
            .await,
        expect_unauthorized,
    );
    assert_rejected(
        p.sync_reference_catalog(&[CatalogSource::new("https://x/catalog", RefScope::Open)])
            .await,
        expect_unauthorized,
    );
    assert_rejected(p.create_path("week-1", "Week 1").await, expect_unauthorized);
    assert_rejected(
        p.update_path(
            "week-1",
            PathUpdate {
                sort_order: Some(3),
                ..Default::default()
            },
        )
        .await,
        expect_unauthorized,
    );
    assert_rejected(p.delete_path("week-1").await, expect_unauthorized);
    assert_rejected(
        p.save_task(
            "week-1",
            UpsertTaskRequest {
                day: Some(1),
                title: "Welcome".into(),
                ..Default::default()
            },
        )
        .await,
        expect_unauthorized,
    );
    assert_rejected(
        p.update_task(id, UpdateTaskRequest::default()).await,
        expect_unauthorized,
    );
    assert_rejected(p.delete_task(id).await, expect_unauthorized);
    assert_rejected(
        p.import_tasks_csv("week-1", "1 - Welcome,,,,").await,
        expect_unauthorized,
    );
    assert_rejected(
        p.import_tasks_pipe("week-1", "1|Welcome|||||").await,
        expect_unauthorized,
    );
    assert_rejected(
        p.create_invite(Role::Employee, None).await,
        expect_unauthorized,
    );
    assert_rejected(p.revoke_invite("token").await, expect_unauthorized);
    assert_rejected(p.list_invites().await, expect_unauthorized);
}

fn assert_untouched(h: &Harness) {
    assert_eq!(h.store.calls(), 0, "store must not be called");
    assert_eq!(h.files.calls.load(Ordering::SeqCst), 0, "files must not be written");
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0, "nothing may be fetched");
    assert!(h.cache.seen().is_empty(), "no page may be revalidated");
}

#[tokio::test]
async fn test_employee_is_forbidden_everywhere_without_store_calls() {
    let h = harness(employee());
    run_every_mutation(&h, false).await;
    assert_untouched(&h);
}

#[tokio::test]
async fn test_viewer_is_forbidden_everywhere_without_store_calls() {
    let h = harness(viewer());
    run_every_mutation(&h, false).await;
    assert_untouched(&h);
}

#[tokio::test]
async fn test_missing_session_is_unauthorized_without_store_calls() {
    let h = harness(None);
    run_every_mutation(&h, true).await;
    assert_untouched(&h);
}

#[tokio::test]
async fn test_trainer_cannot_mint_admin_invite() {
    let h = harness(trainer());
    let err = h
        .portal
        .create_invite(Role::Administrator, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert_eq!(h.store.calls(), 0);

    // Non-admin invites are fine for trainers.
    let invite = h.portal.create_invite(Role::Employee, None).await.unwrap();
    assert_eq!(invite.role, Role::Employee);
}

#[tokio::test]
async fn test_admin_can_mint_admin_invite() {
    let h = harness(admin());
    let invite = h
        .portal
        .create_invite(Role::Administrator, Some("boss@example.com"))
        .await
        .unwrap();
    assert_eq!(invite.role, Role::Administrator);
    assert_eq!(invite.email.as_deref(), Some("boss@example.com"));
}

#[tokio::test]
async fn test_reads_open_to_every_role_but_need_a_session() {
    let h = harness(viewer());
    assert!(h
        .portal
        .list_records(RecordKind::Document, Default::default())
        .await
        .unwrap()
        .is_empty());
    assert!(h.portal.list_paths().await.unwrap().is_empty());

    let anonymous = harness(None);
    assert!(matches!(
        anonymous.portal.list_paths().await,
        Err(Error::Unauthorized(_))
    ));
}
