use changecache::cli::Cli;
use changecache::{run_app, ExitCode, HashStore};
use clap::Parser;
use std::path::Path;
use tempfile::tempdir;

fn check(cache: &Path, extra: &[&str], paths: &[&Path]) -> anyhow::Result<ExitCode> {
    let mut args = vec![
        "changecache".to_string(),
        "-q".to_string(),
        "check".to_string(),
        "--cache-file".to_string(),
        cache.to_string_lossy().into_owned(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
    run_app(Cli::try_parse_from(args).unwrap())
}

#[test]
fn test_check_exit_codes_across_runs() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir(&src).unwrap();
    std::fs::write(src.join("a.c"), "int a;").unwrap();
    std::fs::write(src.join("b.c"), "int b;").unwrap();
    let cache = dir.path().join(".changecache");

    assert_eq!(check(&cache, &[], &[&src]).unwrap(), ExitCode::Success);
    assert_eq!(HashStore::from_file(&cache).unwrap().len(), 2);

    assert_eq!(check(&cache, &[], &[&src]).unwrap(), ExitCode::NoChanges);

    std::fs::write(src.join("b.c"), "int b = 1;").unwrap();
    assert_eq!(check(&cache, &["--cascade"], &[&src]).unwrap(), ExitCode::Success);
    assert_eq!(check(&cache, &["--cascade"], &[&src]).unwrap(), ExitCode::NoChanges);
}

#[test]
fn test_check_parallel_json() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "a").unwrap();
    let cache = dir.path().join(".changecache");

    let code = check(&cache, &["--parallel", "--io-threads", "2", "--json"], &[&file]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_check_missing_path_is_partial_success() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "a").unwrap();
    let missing = dir.path().join("missing.txt");
    let cache = dir.path().join(".changecache");

    assert_eq!(check(&cache, &[], &[&file, &missing]).unwrap(), ExitCode::PartialSuccess);
    assert!(HashStore::from_file(&cache).unwrap().len() == 1);
}

#[test]
fn test_check_strict_missing_path_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let cache = dir.path().join(".changecache");

    let err = check(&cache, &["--strict"], &[&missing]).unwrap_err();
    assert!(err
        .downcast_ref::<changecache::CacheError>()
        .is_some_and(changecache::CacheError::is_item_local));
}

#[test]
fn test_strict_abort_then_new_change_is_reported() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.c");
    std::fs::write(&a, "int a;").unwrap();
    let missing = dir.path().join("missing.c");
    let cache = dir.path().join(".changecache");

    assert!(check(&cache, &["--strict"], &[&a, &missing]).is_err());
    // a.c was emitted before the abort and its digest kept.
    assert_eq!(check(&cache, &[], &[&a]).unwrap(), ExitCode::NoChanges);

    std::fs::write(&a, "int a = 2;").unwrap();
    assert!(check(&cache, &["--strict"], &[&a, &missing]).is_err());
    std::fs::write(&missing, "int m;").unwrap();
    assert_eq!(check(&cache, &["--strict"], &[&a, &missing]).unwrap(), ExitCode::Success);
}

#[test]
fn test_check_corrupt_cache_errors() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "a").unwrap();
    let cache = dir.path().join(".changecache");
    std::fs::write(&cache, "not json").unwrap();

    assert!(check(&cache, &[], &[&file]).is_err());
    assert_eq!(std::fs::read_to_string(&cache).unwrap(), "not json");
}

#[test]
fn test_show_missing_and_existing_cache() {
    let dir = tempdir().unwrap();
    let cache = dir.path().join(".changecache");
    let cache_arg = cache.to_string_lossy().into_owned();

    let show = || {
        run_app(Cli::try_parse_from(["changecache", "-q", "show", "--cache-file", cache_arg.as_str()]).unwrap())
    };
    assert_eq!(show().unwrap(), ExitCode::Success);

    let file = dir.path().join("a.txt");
    std::fs::write(&file, "a").unwrap();
    check(&cache, &[], &[&file]).unwrap();
    assert_eq!(show().unwrap(), ExitCode::Success);
}
