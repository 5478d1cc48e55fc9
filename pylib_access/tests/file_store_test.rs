//! Tests for the JSON file bookmark store.

use pylib_access::error::StoreError;
use pylib_access::storage::{BookmarkStore, FileStore};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_missing_file_loads_nothing() {
    let temp = tempdir().unwrap();
    let store = FileStore::new(temp.path().join("bookmarks.json"));
    assert_eq!(store.load("PYTHON_LIB_DIR").unwrap(), None);
}

#[test]
fn test_save_creates_parent_directories() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("nested").join("dir").join("bookmarks.json");
    let store = FileStore::new(&path);

    store.save("PYTHON_LIB_DIR", b"bookmark-bytes").unwrap();

    assert!(path.is_file());
    assert_eq!(
        store.load("PYTHON_LIB_DIR").unwrap(),
        Some(b"bookmark-bytes".to_vec())
    );
}

#[test]
fn test_save_replaces_previous_value() {
    let temp = tempdir().unwrap();
    let store = FileStore::new(temp.path().join("bookmarks.json"));

    store.save("PYTHON_LIB_DIR", b"old").unwrap();
    store.save("PYTHON_LIB_DIR", b"new").unwrap();

    assert_eq!(store.load("PYTHON_LIB_DIR").unwrap(), Some(b"new".to_vec()));
}

#[test]
fn test_keys_are_independent() {
    let temp = tempdir().unwrap();
    let store = FileStore::new(temp.path().join("bookmarks.json"));

    store.save("A", b"a").unwrap();
    store.save("B", b"b").unwrap();
    assert!(store.remove("A").unwrap());

    assert_eq!(store.load("A").unwrap(), None);
    assert_eq!(store.load("B").unwrap(), Some(b"b".to_vec()));
}

#[test]
fn test_remove_missing_key() {
    let temp = tempdir().unwrap();
    let store = FileStore::new(temp.path().join("bookmarks.json"));
    assert!(!store.remove("PYTHON_LIB_DIR").unwrap());
    assert!(!temp.path().join("bookmarks.json").exists());
}

#[test]
fn test_entry_records_write_time() {
    let temp = tempdir().unwrap();
    let store = FileStore::new(temp.path().join("bookmarks.json"));
    let before = chrono::Utc::now();

    store.save("PYTHON_LIB_DIR", b"bytes").unwrap();

    let entry = store.entry("PYTHON_LIB_DIR").unwrap().unwrap();
    assert_eq!(entry.bookmark, b"bytes".to_vec());
    assert!(entry.updated_at >= before);
}

#[test]
fn test_corrupt_file_is_reported() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bookmarks.json");
    fs::write(&path, "{ not json").unwrap();
    let store = FileStore::new(&path);

    assert!(matches!(
        store.load("PYTHON_LIB_DIR"),
        Err(StoreError::Corrupt { .. })
    ));
    // A failed save must not clobber the file
    assert!(store.save("PYTHON_LIB_DIR", b"bytes").is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn test_empty_file_is_empty_store() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bookmarks.json");
    fs::write(&path, "").unwrap();
    let store = FileStore::new(&path);
    assert_eq!(store.load("PYTHON_LIB_DIR").unwrap(), None);
}
