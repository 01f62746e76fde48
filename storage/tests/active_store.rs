use chrono::Utc;
use dex_core::model::{Task, TaskStore};
use dex_storage::{ActiveStore, FileActiveStore};
use tempfile::tempdir;

fn sample(id: &str) -> Task {
    let now = Utc::now();
    Task {
        id: id.to_string(),
        parent_id: None,
        name: format!("task {id}"),
        description: String::new(),
        priority: 1,
        completed: false,
        started_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
        result: None,
        metadata: None,
        blocked_by: vec![],
        blocks: vec![],
        children: vec![],
    }
}

#[test]
fn repeated_saves_never_leave_a_partial_file_behind() {
    let tmp = tempdir().unwrap();
    let engine = FileActiveStore::new(tmp.path(), "proj");

    for round in 0..5 {
        let mut store = TaskStore::new("proj");
        for n in 0..round + 1 {
            let id = format!("a000000{n}");
            store.tasks.insert(id.clone(), sample(&id));
        }
        engine.save(&store).unwrap();
        let reloaded = engine.load().unwrap();
        assert_eq!(reloaded.tasks.len(), round + 1);
    }

    // no stray temp file left behind after the final rename
    let entries: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert!(entries.iter().all(|name| !name.ends_with(".tmp")));
}

#[test]
fn store_directory_is_created_on_first_save() {
    let tmp = tempdir().unwrap();
    let nested = tmp.path().join("a").join("b");
    let engine = FileActiveStore::new(&nested, "proj");

    let mut store = TaskStore::new("proj");
    store.tasks.insert("a0000001".to_string(), sample("a0000001"));
    engine.save(&store).unwrap();

    assert!(nested.join("tasks.jsonl").exists());
}
