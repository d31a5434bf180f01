//! Cookie/ローカルストレージのファイル保存テスト

use objects_counter::storage::{FileStore, COOKIES_FILE_NAME};
use objects_counter_common::KeyValueStore;
use tempfile::tempdir;

#[test]
fn test_save_and_reload() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(COOKIES_FILE_NAME);

    let mut store = FileStore::load(&path);
    assert!(store.is_empty());
    store.set("username", "alice");
    store.set("userToken", "t0k3n");
    store.save().unwrap();

    let reloaded = FileStore::load(&path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("username").as_deref(), Some("alice"));
    assert_eq!(reloaded.get("userToken").as_deref(), Some("t0k3n"));
}

#[test]
fn test_remove_is_persisted() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(COOKIES_FILE_NAME);

    let mut store = FileStore::load(&path);
    store.set("userToken", "t0k3n");
    store.save().unwrap();

    let mut store = FileStore::load(&path);
    store.remove("userToken");
    store.save().unwrap();

    assert_eq!(FileStore::load(&path).get("userToken"), None);
}

/// 変更がなければファイルを作らない
#[test]
fn test_save_without_changes_writes_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join(COOKIES_FILE_NAME);

    let mut store = FileStore::load(&path);
    store.save().unwrap();
    assert!(!path.exists());

    store.set("theme", "dark");
    store.save().unwrap();
    assert!(path.exists());
}

#[test]
fn test_unreadable_file_starts_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(COOKIES_FILE_NAME);
    std::fs::write(&path, "{ not json").unwrap();

    let store = FileStore::load(&path);
    assert!(store.is_empty());
}

#[test]
fn test_version_mismatch_starts_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(COOKIES_FILE_NAME);
    std::fs::write(&path, r#"{"version": 99, "entries": {"username": "alice"}}"#).unwrap();

    let store = FileStore::load(&path);
    assert!(store.is_empty());
    assert_eq!(store.path(), path.as_path());
}
