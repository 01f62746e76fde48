//! End-to-end: a task is created, completed, archived, then looked up
//! through `TaskService::get_with_archive` once it no longer exists in the
//! active store.

use std::sync::Arc;

use chrono::Utc;
use dex_core::ids::FixedClock;
use dex_service::{Archiver, CreateInput, NoopSyncHook, TaskService, TaskView};
use dex_storage::{TokioActiveStore, TokioArchiveLog};
use tempfile::tempdir;

#[tokio::test]
async fn completed_task_survives_archival_as_a_view() {
    let tmp = tempdir().unwrap();
    let active = Arc::new(TokioActiveStore::new(tmp.path(), "proj"));
    let archive = Arc::new(TokioArchiveLog::new(tmp.path()));
    let svc = TaskService::new(
        active.clone(),
        archive.clone(),
        Arc::new(FixedClock(Utc::now())),
        Arc::new(NoopSyncHook),
    );

    let task = svc
        .create(CreateInput {
            name: "ship the release".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    svc.complete(&task.id, "shipped".to_string(), None).await.unwrap();

    let archiver = Archiver::new(active, archive);
    archiver.archive_lineage(&task.id, Utc::now()).await.unwrap();

    assert!(svc.get(&task.id).await.unwrap().is_none());

    match svc.get_with_archive(&task.id).await.unwrap() {
        Some(TaskView::Archived(archived)) => {
            assert_eq!(archived.id, task.id);
            assert_eq!(archived.result.as_deref(), Some("shipped"));
        }
        other => panic!("expected an archived view, got {other:?}"),
    }

    let found = svc.search("release", true).await.unwrap();
    assert!(found.iter().any(|v| matches!(v, TaskView::Archived(a) if a.id == task.id)));
}
