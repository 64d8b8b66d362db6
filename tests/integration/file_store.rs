//! Integration tests for the directory-backed store.
//!
//! Two `FileStore` handles on one temporary directory stand in for two
//! processes. Changes only cross between them when `poll_changes` runs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use parking_lot::Mutex;
use tasklist::binding::DurableBinding;
use tasklist::storage::file::FileStore;
use tasklist::storage::{KeyValueStore, StorageEvent, StoreError};
use tasklist::tasks::{ScriptedIds, TaskStateManager};
use tasklist_proto::task::{DEFAULT_STORAGE_KEY, Task};

fn recorder(store: &FileStore) -> Arc<Mutex<Vec<StorageEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.listen(Arc::new(move |event: &StorageEvent| {
        sink.lock().push(event.clone());
    }));
    events
}

fn make_manager(store: &Arc<FileStore>, prefix: &str) -> TaskStateManager {
    let kv: Arc<dyn KeyValueStore> = Arc::clone(store) as Arc<dyn KeyValueStore>;
    TaskStateManager::new(DurableBinding::new(kv, DEFAULT_STORAGE_KEY))
        .with_id_generator(Arc::new(ScriptedIds::sequential(prefix, 8)))
}

#[test]
fn set_get_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    assert_eq!(store.get("greeting").unwrap(), None);
    store.set("greeting", "hello").unwrap();
    assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
    assert!(dir.path().join("greeting.json").exists());

    store.remove("greeting").unwrap();
    assert_eq!(store.get("greeting").unwrap(), None);
    store.remove("greeting").unwrap();
}

#[test]
fn open_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = FileStore::open(&nested).unwrap();
    assert_eq!(store.dir(), nested.as_path());
    assert!(nested.is_dir());
}

#[test]
fn empty_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    assert!(matches!(store.set("", "x"), Err(StoreError::InvalidKey(_))));
}

#[test]
fn unsafe_keys_stay_inside_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("data")).unwrap();

    store.set("../escape", "contained").unwrap();
    assert!(!dir.path().join("escape.json").exists());
    assert_eq!(store.get("../escape").unwrap().as_deref(), Some("contained"));
}

#[test]
fn poll_reports_changes_from_other_handles_only() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FileStore::open(dir.path()).unwrap();
    let reader = FileStore::open(dir.path()).unwrap();
    let writer_events = recorder(&writer);
    let reader_events = recorder(&reader);

    writer.set("k", "v1").unwrap();
    assert!(reader_events.lock().is_empty());

    assert_eq!(reader.poll_changes().unwrap(), 1);
    assert_eq!(writer.poll_changes().unwrap(), 0);
    assert!(writer_events.lock().is_empty());

    let events = reader_events.lock().clone();
    assert_eq!(
        events,
        vec![StorageEvent {
            key: "k".to_string(),
            old_value: None,
            new_value: Some("v1".to_string()),
        }]
    );

    // Nothing new: a second poll is quiet.
    assert_eq!(reader.poll_changes().unwrap(), 0);
}

#[test]
fn poll_reports_removals() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FileStore::open(dir.path()).unwrap();
    writer.set("k", "v1").unwrap();

    let reader = FileStore::open(dir.path()).unwrap();
    let events = recorder(&reader);
    writer.remove("k").unwrap();

    assert_eq!(reader.poll_changes().unwrap(), 1);
    let seen = events.lock().clone();
    assert_eq!(seen[0].old_value.as_deref(), Some("v1"));
    assert_eq!(seen[0].new_value, None);
}

#[test]
fn existing_contents_are_the_baseline() {
    let dir = tempfile::tempdir().unwrap();
    FileStore::open(dir.path()).unwrap().set("k", "old").unwrap();

    let reader = FileStore::open(dir.path()).unwrap();
    assert_eq!(reader.poll_changes().unwrap(), 0);
}

#[test]
fn stray_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let reader = FileStore::open(dir.path()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
    std::fs::write(dir.path().join("k.json.tmp"), "partial").unwrap();
    assert_eq!(reader.poll_changes().unwrap(), 0);
}

#[test]
fn managers_in_two_processes_reconcile_on_poll() {
    let dir = tempfile::tempdir().unwrap();
    let store_a = Arc::new(FileStore::open(dir.path()).unwrap());
    let store_b = Arc::new(FileStore::open(dir.path()).unwrap());
    let mut proc_a = make_manager(&store_a, "a");
    let proc_b = make_manager(&store_b, "b");
    let mut rx = proc_b.watch();
    assert!(rx.try_recv().unwrap().tasks.is_empty());

    proc_a.add_task("written by a");
    assert!(proc_b.snapshot().tasks.is_empty());

    store_b.poll_changes().unwrap();
    let adopted = rx.try_recv().unwrap();
    assert_eq!(adopted.tasks, proc_a.snapshot().tasks);
    assert_eq!(proc_b.snapshot().tasks, adopted.tasks);
}

#[test]
fn malformed_file_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(format!("{DEFAULT_STORAGE_KEY}.json")),
        "[{\"broken\":",
    )
    .unwrap();

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let mgr = make_manager(&store, "x");
    assert!(mgr.snapshot().tasks.is_empty());
}

#[test]
fn manager_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut mgr = make_manager(&store, "first");
        mgr.add_task("persist me");
        mgr.toggle_task(&"first-1".into());
    }

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let mgr = make_manager(&store, "second");
    let tasks: Vec<Task> = mgr.snapshot().tasks;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].text, "persist me");
    assert!(tasks[0].completed);
}
