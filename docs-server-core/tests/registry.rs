use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use docs_server_core::registry::Registry;

fn files(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_get_on_empty_registry_is_absent() {
    let registry = Registry::new();
    assert!(registry.get("v1").is_none());
    assert!(registry.is_empty());
    assert!(registry.list_versions().is_empty());
}

#[test]
fn test_upsert_creates_then_replaces() {
    let registry = Registry::new();
    registry.upsert("v1", files(&["api", "users"]));
    assert_eq!(registry.get("v1").unwrap().files, files(&["api", "users"]));

    registry.upsert("v1", files(&["orders"]));
    let entry = registry.get("v1").unwrap();
    assert_eq!(entry.version, "v1");
    assert_eq!(entry.files, files(&["orders"]));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_upsert_is_idempotent() {
    let registry = Registry::new();
    registry.upsert("v1", files(&["api"]));
    registry.upsert("v2", files(&["api", "users"]));
    let before = registry.snapshot();

    registry.upsert("v1", files(&["api"]));

    assert_eq!(before, registry.snapshot());
}

#[test]
fn test_listing_keeps_discovery_order() {
    let registry = Registry::new();
    registry.upsert("v3", files(&["api"]));
    registry.upsert("v1", files(&["api"]));
    registry.upsert("v2", files(&["api"]));
    registry.upsert("v3", files(&["api", "users"]));

    assert_eq!(registry.list_versions(), files(&["v3", "v1", "v2"]));
}

#[test]
fn test_remove_is_noop_when_absent() {
    let registry = Registry::new();
    registry.upsert("v1", files(&["api"]));

    assert!(!registry.remove("v9"));
    assert!(registry.remove("v1"));
    assert!(!registry.remove("v1"));
    assert!(registry.is_empty());
    assert!(registry.list_versions().is_empty());
}

#[test]
fn test_has_file() {
    let registry = Registry::new();
    registry.upsert("v1", files(&["api", "v2/users"]));
    let entry = registry.get("v1").unwrap();

    assert!(entry.has_file("api"));
    assert!(entry.has_file("v2/users"));
    assert!(!entry.has_file("users"));
}

#[test]
fn test_concurrent_readers_never_see_partial_entries() {
    let registry = Arc::new(Registry::new());
    let old = files(&["api", "users"]);
    let new = files(&["orders", "payments", "refunds"]);
    registry.upsert("v1", old.clone());

    let done = Arc::new(AtomicBool::new(false));

    thread::scope(|s| {
        for _ in 0..8 {
            let registry = registry.clone();
            let done = done.clone();
            let (old, new) = (old.clone(), new.clone());
            s.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    if let Some(entry) = registry.get("v1") {
                        assert!(
                            entry.files == old || entry.files == new,
                            "observed mixed entry: {:?}",
                            entry.files
                        );
                    }
                    let listed = registry.list_versions();
                    assert!(listed.is_empty() || listed == files(&["v1"]));
                }
            });
        }

        for i in 0..2_000 {
            match i % 3 {
                0 => registry.upsert("v1", new.clone()),
                1 => registry.upsert("v1", old.clone()),
                _ => {
                    registry.remove("v1");
                }
            }
        }
        done.store(true, Ordering::Release);
    });
}
