use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use smush_core::error::SmushError;
use smush_core::io::score_cache::{ScoreCache, SourceKey};

fn input_file(bytes: usize) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(&vec![0u8; bytes]).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn test_missing_cache_is_empty() {
    let dir = TempDir::new().unwrap();
    let cache = ScoreCache::load(&dir.path().join("scores.toml")).unwrap();
    assert!(cache.is_empty());
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("scores.toml");
    let input = input_file(64);
    let key = SourceKey::of(input.path()).unwrap();
    assert_eq!(key.byte_length, 64);

    let mut cache = ScoreCache::default();
    cache.insert("proxy", key.clone(), vec![0.5, 1.25, 3.0]);
    cache.save(&cache_path).unwrap();

    let loaded = ScoreCache::load(&cache_path).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.get("proxy", &key), Some(&[0.5, 1.25, 3.0][..]));
    assert_eq!(loaded.get("other", &key), None);
}

#[test]
fn test_stale_entry_is_ignored() {
    let input = input_file(10);
    let key = SourceKey::of(input.path()).unwrap();
    let mut cache = ScoreCache::default();
    cache.insert("proxy", key.clone(), vec![1.0]);

    let grown = SourceKey {
        byte_length: 11,
        ..key
    };
    assert_eq!(cache.get("proxy", &grown), None);
}

#[test]
fn test_insert_replaces_same_label_and_path() {
    let input = input_file(10);
    let key = SourceKey::of(input.path()).unwrap();
    let mut cache = ScoreCache::default();
    cache.insert("proxy", key.clone(), vec![1.0]);
    cache.insert("proxy", key.clone(), vec![2.0]);
    cache.insert("full", key.clone(), vec![3.0]);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("proxy", &key), Some(&[2.0][..]));
}

#[test]
fn test_corrupt_cache_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scores.toml");
    std::fs::write(&path, "entry = 5\n[[[").unwrap();
    assert!(matches!(ScoreCache::load(&path), Err(SmushError::Cache(_))));
}
