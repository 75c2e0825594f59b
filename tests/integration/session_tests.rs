use changecache::batch::Item;
use changecache::{CacheConfig, CacheError, CacheSession, FlushOutcome, HashStore};
use tempfile::tempdir;

#[test]
fn test_digests_survive_restart() {
    let dir = tempdir().unwrap();
    let config = CacheConfig::new(dir.path().join("cache.json"));

    let mut session = CacheSession::open(config.clone()).unwrap();
    session
        .batch()
        .run(vec![Item::buffer("a.txt", "hello"), Item::buffer("b.txt", "world")])
        .unwrap();
    assert_eq!(session.close(), FlushOutcome::Saved);

    let session = CacheSession::open(config).unwrap();
    assert_eq!(session.store().len(), 2);
    assert!(session.store().contains("a.txt"));
}

#[test]
fn test_missing_parent_directory_only_warns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no").join("such").join("cache.json");

    let mut session = CacheSession::open(CacheConfig::new(&path)).unwrap();
    session.batch().run(vec![Item::buffer("a", "a")]).unwrap();

    assert_eq!(session.close(), FlushOutcome::Failed);
    assert!(!path.exists());
    assert!(!path.parent().unwrap().exists());
}

#[test]
fn test_corrupt_cache_is_fatal_at_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let err = CacheSession::open(CacheConfig::new(&path)).unwrap_err();
    assert!(matches!(err, CacheError::Parse { .. }));

    // The file is left for the user to inspect.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2, 3]");
}

#[test]
fn test_save_replaces_file_without_leftovers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{}").unwrap();

    let mut session = CacheSession::open(CacheConfig::new(&path)).unwrap();
    session.batch().run(vec![Item::buffer("a", "a")]).unwrap();
    assert_eq!(session.close(), FlushOutcome::Saved);

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(HashStore::from_file(&path).unwrap().len(), 1);
}

#[test]
fn test_strict_failure_keeps_earlier_digests() {
    let dir = tempdir().unwrap();
    let config = CacheConfig::new(dir.path().join("cache.json")).with_strict(true);

    let mut session = CacheSession::open(config.clone()).unwrap();
    let result = session.batch().run(vec![
        Item::buffer("a", "a"),
        Item::file(dir.path().join("missing.txt")),
        Item::buffer("b", "b"),
    ]);
    let err = result.unwrap_err();
    assert!(err.is_item_local());
    let emitted: Vec<&str> = err
        .partial_output()
        .unwrap()
        .emitted
        .iter()
        .map(Item::name)
        .collect();
    assert_eq!(emitted, vec!["a"]);
    assert_eq!(session.close(), FlushOutcome::Saved);

    let session = CacheSession::open(config).unwrap();
    assert!(session.store().contains("a"));
    assert!(!session.store().contains("b"));
}

#[test]
fn test_unchanged_rerun_does_not_rewrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let config = CacheConfig::new(&path);

    let mut session = CacheSession::open(config.clone()).unwrap();
    session.batch().run(vec![Item::buffer("a", "a")]).unwrap();
    session.close();
    let before = std::fs::read_to_string(&path).unwrap();

    let mut session = CacheSession::open(config).unwrap();
    session.batch().run(vec![Item::buffer("a", "a")]).unwrap();
    assert_eq!(session.close(), FlushOutcome::Clean);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}
