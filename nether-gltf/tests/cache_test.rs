//! Document cache bounds and sharing.

mod fixtures;

use std::sync::Arc;

use tempfile::tempdir;

use nether_gltf::{CodecConfig, DocumentCache, ErrorKind};

#[test]
fn test_cache_never_exceeds_capacity() {
    let dir = tempdir().expect("Failed to create temp dir");
    let paths: Vec<_> = (0..6)
        .map(|i| fixtures::write_named_scene(dir.path(), &format!("scene_{i}")))
        .collect();

    let cache = DocumentCache::default();
    assert_eq!(cache.capacity(), 5);
    for path in &paths {
        cache.load_or_get(path).expect("Failed to load fixture");
        assert!(cache.len() <= 5);
    }
    assert_eq!(cache.len(), 5);
    assert!(cache.evictions() >= 1);

    // first path was least recently used
    assert!(cache.get(&paths[0]).is_none());
    assert!(!cache.evict(&paths[0]));
    assert!(cache.evict(&paths[5]));
    assert_eq!(cache.len(), 4);
}

#[test]
fn test_failed_load_leaves_cache_unchanged() {
    let dir = tempdir().unwrap();
    let good = fixtures::write_named_scene(dir.path(), "good");
    let bad = dir.path().join("bad.gltf");
    std::fs::write(&bad, b"{\"scenes\": []}").unwrap();

    let cache = DocumentCache::new(2);
    cache.load_or_get(&good).unwrap();
    let err = cache.load_or_get(&bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.evictions(), 0);
}

#[test]
fn test_concurrent_loads_share_one_document() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_named_scene(dir.path(), "shared");
    let cache = DocumentCache::default();

    let docs: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| cache.load_or_get(&path).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.len(), 1);
    for doc in &docs[1..] {
        assert!(Arc::ptr_eq(&docs[0], doc));
    }
}

#[test]
fn test_cache_from_config() {
    let config = CodecConfig::from_toml_str("[cache]\ncapacity = 3").unwrap();
    let cache = DocumentCache::from_config(&config.cache);
    assert_eq!(cache.capacity(), 3);

    let dir = tempdir().unwrap();
    let path = fixtures::write_named_scene(dir.path(), "Intro");
    assert_eq!(cache.scene_list(&path).unwrap(), vec!["Intro"]);
}
