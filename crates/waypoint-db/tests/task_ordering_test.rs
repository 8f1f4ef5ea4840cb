//! PostgreSQL-backed checks for task ordering and invite consumption.
//!
//! These need a live database (DATABASE_URL or the local test default) and
//! run with `--ignored`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use waypoint_db::test_fixtures::TestDatabase;
use waypoint_db::{
    Attachment, CreateInviteRequest, CreateRecordRequest, InviteRepository, LearningRepository,
    RecordKind, RecordRepository, Role, TagFilter, UpdateTaskRequest, UpsertTaskRequest,
};

async fn test_database() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

fn task(day: Option<i32>, title: &str) -> UpsertTaskRequest {
    UpsertTaskRequest {
        day,
        title: title.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_upserts_get_distinct_positions() {
    let test_db = test_database().await;
    let learning = Arc::new(test_db.db.learning.clone());
    let path = learning.create_path("week-1", "Week 1").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let learning = learning.clone();
            tokio::spawn(async move {
                learning
                    .upsert_task(path.id, task(Some(1), &format!("Task {}", i)))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().expect("upsert should succeed after retries");
    }

    let mut positions: Vec<i32> = learning
        .list_tasks(path.id)
        .await
        .unwrap()
        .iter()
        .map(|t| t.position)
        .collect();
    positions.sort();
    assert_eq!(positions, (1..=8).collect::<Vec<_>>());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_extras_share_one_bucket_and_key() {
    let test_db = test_database().await;
    let learning = &test_db.db.learning;
    let path = learning.create_path("week-2", "Week 2").await.unwrap();

    let a = learning.upsert_task(path.id, task(None, "Bonus")).await.unwrap();
    let b = learning.upsert_task(path.id, task(None, "Bonus")).await.unwrap();
    let c = learning.upsert_task(path.id, task(None, "Another")).await.unwrap();

    assert!(a.created);
    assert!(!b.created);
    assert_eq!(a.id, b.id);
    assert_eq!(learning.fetch_task(c.id).await.unwrap().position, 2);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_attachments_roundtrip_and_day_move() {
    let test_db = test_database().await;
    let learning = &test_db.db.learning;
    let path = learning.create_path("week-3", "Week 3").await.unwrap();

    let mut req = task(Some(1), "Read handbook");
    req.attachments = vec![Attachment::new("Handbook", "https://intranet.example/h.pdf")];
    let created = learning.upsert_task(path.id, req).await.unwrap();
    learning.upsert_task(path.id, task(Some(2), "Shadow")).await.unwrap();

    learning
        .update_task(
            created.id,
            UpdateTaskRequest {
                day: Some(Some(2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let moved = learning.fetch_task(created.id).await.unwrap();
    assert_eq!(moved.day, Some(2));
    assert_eq!(moved.position, 2);
    assert_eq!(moved.attachments.len(), 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_invite_consumed_once() {
    let test_db = test_database().await;
    let invites = &test_db.db.invites;
    let now = Utc::now();
    invites
        .create(CreateInviteRequest {
            token: "tok-pg".into(),
            role: Role::Employee,
            email: Some("new.hire@example.com".into()),
            expires_at: now + Duration::hours(1),
        })
        .await
        .unwrap();

    let first = invites.consume("tok-pg", now).await.unwrap();
    let second = invites.consume("tok-pg", now).await.unwrap();
    assert_eq!(first.unwrap().email.as_deref(), Some("new.hire@example.com"));
    assert!(second.is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_record_tag_containment() {
    let test_db = test_database().await;
    let records = &test_db.db.records;
    records
        .insert(CreateRecordRequest {
            kind: RecordKind::Upload,
            title: "Index".into(),
            path: "/uploads/index.pdf".into(),
            tags: vec!["Manuals".into(), "Index File".into()],
        })
        .await
        .unwrap();

    let found = records
        .list(RecordKind::Upload, &TagFilter::Contains("Index File".into()))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    let none = records
        .list(RecordKind::Upload, &TagFilter::Contains("Reference File".into()))
        .await
        .unwrap();
    assert!(none.is_empty());

    test_db.cleanup().await;
}
