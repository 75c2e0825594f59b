use changecache::batch::{Batch, BatchMode, BatchObserver, Item};
use changecache::cache::HashStore;
use changecache::digest::DigestAlgorithm;
use changecache::{CacheConfig, CacheSession};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn write_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("file{}.txt", i));
            std::fs::write(&path, format!("content {}", i)).unwrap();
            path
        })
        .collect()
}

fn file_items(paths: &[PathBuf]) -> Vec<Item> {
    paths.iter().map(Item::file).collect()
}

fn emitted_names(items: &[Item]) -> Vec<String> {
    items.iter().map(|i| i.name().to_string()).collect()
}

#[derive(Default)]
struct HitLog {
    hits: Mutex<Vec<String>>,
    reports: Mutex<usize>,
}

impl BatchObserver for HitLog {
    fn on_cache_hit(&self, name: &str) {
        self.hits.lock().unwrap().push(name.to_string());
    }

    fn on_cache_report(&self, _hits: &[String]) {
        *self.reports.lock().unwrap() += 1;
    }
}

#[test]
fn test_cascade_only_second_changed_emits_all_in_order() {
    let mut store = HashStore::new();
    let seed = vec![
        Item::buffer("one", "1"),
        Item::buffer("two", "2"),
        Item::buffer("three", "3"),
    ];
    Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Independent)
        .run(seed)
        .unwrap();

    let output = Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Cascade)
        .run(vec![
            Item::buffer("one", "1"),
            Item::buffer("two", "2 edited"),
            Item::buffer("three", "3"),
        ])
        .unwrap();

    assert_eq!(emitted_names(&output.emitted), vec!["one", "two", "three"]);
    assert!(output.report.cascaded);
}

#[test]
fn test_cascade_withheld_hits_are_signalled_even_when_released() {
    let mut store = HashStore::new();
    let items = || vec![Item::buffer("one", "1"), Item::buffer("two", "2"), Item::buffer("three", "3")];
    Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Cascade)
        .run(items())
        .unwrap();

    let log = Arc::new(HitLog::default());
    let output = Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Cascade)
        .with_observer(log.clone())
        .run(vec![
            Item::buffer("one", "1"),
            Item::buffer("two", "2"),
            Item::buffer("three", "3 edited"),
        ])
        .unwrap();

    assert_eq!(emitted_names(&output.emitted), vec!["one", "two", "three"]);
    assert_eq!(*log.hits.lock().unwrap(), vec!["one", "two"]);
    assert!(output.report.cache_hits.is_empty());
}

#[test]
fn test_single_changed_item_is_the_only_output() {
    let dir = tempdir().unwrap();
    let paths = write_files(dir.path(), 4);
    let config = CacheConfig::new(dir.path().join(".changecache"));

    let mut session = CacheSession::open(config).unwrap();
    session.batch().run(file_items(&paths)).unwrap();

    std::fs::write(&paths[2], "edited").unwrap();
    let output = session.batch().run(file_items(&paths)).unwrap();
    assert_eq!(
        emitted_names(&output.emitted),
        vec![paths[2].to_string_lossy().into_owned()]
    );
    assert_eq!(output.report.emitted, 1);
}

#[test]
fn test_cascade_none_changed_emits_nothing() {
    let mut store = HashStore::new();
    let items = || vec![Item::buffer("one", "1"), Item::buffer("two", "2"), Item::buffer("three", "3")];
    Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Cascade)
        .run(items())
        .unwrap();

    let log = Arc::new(HitLog::default());
    let output = Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Cascade)
        .with_observer(log.clone())
        .run(items())
        .unwrap();

    assert!(output.emitted.is_empty());
    assert_eq!(output.report.cache_hits, vec!["one", "two", "three"]);
    assert_eq!(*log.hits.lock().unwrap(), vec!["one", "two", "three"]);
    assert_eq!(*log.reports.lock().unwrap(), 1);
}

#[test]
fn test_five_files_cascade_across_sessions() {
    let dir = tempdir().unwrap();
    let paths = write_files(dir.path(), 5);
    let config = CacheConfig::new(dir.path().join(".changecache")).with_cascade(true);

    // First run: everything is new.
    let mut session = CacheSession::open(config.clone()).unwrap();
    let output = session.batch().run(file_items(&paths)).unwrap();
    assert_eq!(output.emitted.len(), 5);
    session.close();

    // Changing only the last file releases the whole batch.
    std::fs::write(&paths[4], "edited").unwrap();
    let mut session = CacheSession::open(config.clone()).unwrap();
    let output = session.batch().run(file_items(&paths)).unwrap();
    assert_eq!(
        emitted_names(&output.emitted),
        paths.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>()
    );
    session.close();

    let mut session = CacheSession::open(config).unwrap();
    let output = session.batch().run(file_items(&paths)).unwrap();
    assert!(output.emitted.is_empty());
    assert_eq!(output.report.cache_hits.len(), 5);
    session.close();
}

#[test]
fn test_independent_mode_across_sessions() {
    let dir = tempdir().unwrap();
    let paths = write_files(dir.path(), 3);
    let config = CacheConfig::new(dir.path().join(".changecache"));

    let mut session = CacheSession::open(config.clone()).unwrap();
    assert_eq!(session.batch().run(file_items(&paths)).unwrap().emitted.len(), 3);
    session.close();

    std::fs::write(&paths[1], "edited").unwrap();
    let mut session = CacheSession::open(config).unwrap();
    let output = session.batch().run(file_items(&paths)).unwrap();
    assert_eq!(
        emitted_names(&output.emitted),
        vec![paths[1].to_string_lossy().into_owned()]
    );
    assert_eq!(output.report.cache_hits.len(), 2);
}

#[test]
fn test_cascade_with_unreadable_item_still_cascades() {
    let dir = tempdir().unwrap();
    let mut paths = write_files(dir.path(), 2);
    paths.insert(1, dir.path().join("missing.txt"));

    let mut store = HashStore::new();
    let output = Batch::new(&mut store, DigestAlgorithm::Sha256, BatchMode::Cascade)
        .run(file_items(&paths))
        .unwrap();

    assert_eq!(output.emitted.len(), 2);
    assert_eq!(output.report.failures.len(), 1);
    assert_eq!(output.report.received, 3);
}

#[test]
fn test_parallel_cascade_matches_arrival_order() {
    let dir = tempdir().unwrap();
    let paths = write_files(dir.path(), 12);
    let config = CacheConfig::new(dir.path().join(".changecache"))
        .with_cascade(true)
        .with_io_threads(4);

    let mut session = CacheSession::open(config).unwrap();
    session.batch().run(file_items(&paths)).unwrap();

    std::fs::write(&paths[7], "edited").unwrap();
    let output = session.run_parallel(file_items(&paths)).unwrap();
    assert_eq!(
        emitted_names(&output.emitted),
        paths.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>()
    );
}
