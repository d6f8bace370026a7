use std::fs;
use std::path::Path;
use tempfile::tempdir;

use media_consolidator::hasher::cache::HashCache;
use media_consolidator::hasher::{xxhash, Fingerprinter};
use media_consolidator::storage::models::{HashState, InventoryEntry};
use media_consolidator::storage::Database;
use media_consolidator::SilentReporter;

const EMPTY_DIGEST: &str = "ef46db3751d8e999";

fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Write `content` to `dir/name` and index it.
fn add_file(db: &Database, dir: &Path, name: &str, content: &[u8]) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    let path = slash(&path);
    db.insert_inventory(&[InventoryEntry {
        path: path.clone(),
        size: content.len() as u64,
        extension: ".bin".to_string(),
        created_at: 1704110400.0,
        modified_at: 1704110400.0,
    }])
    .unwrap();
    path
}

fn record(db: &Database, path: &str) -> media_consolidator::storage::models::FileRecord {
    db.get_record_by_path(path).unwrap().unwrap()
}

#[test]
fn test_unique_size_is_skipped_without_hashing() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let lonely = add_file(&db, tmp.path(), "lonely.bin", b"only one of this size");

    let stats = Fingerprinter::new(&db, None, 4096)
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(stats.unique_sizes, 1);
    assert_eq!(stats.partial_hashed, 0);
    let r = record(&db, &lonely);
    assert_eq!(r.hash_state, HashState::Skipped);
    assert_eq!(r.hash_partial, None);
    assert_eq!(r.hash_full, None);
}

#[test]
fn test_same_size_different_content_is_skipped_after_partial() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let a = add_file(&db, tmp.path(), "a.bin", b"aaaa");
    let b = add_file(&db, tmp.path(), "b.bin", b"bbbb");

    let stats = Fingerprinter::new(&db, None, 4096)
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(stats.partial_hashed, 2);
    assert_eq!(stats.unique_partials, 2);
    assert_eq!(stats.full_hashed, 0);
    for path in [a, b] {
        let r = record(&db, &path);
        assert_eq!(r.hash_state, HashState::Skipped);
        assert!(r.hash_partial.is_some());
        assert_eq!(r.hash_full, None);
    }
}

#[test]
fn test_true_duplicates_share_full_hash() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let content = vec![0xAAu8; 20_000];
    let a = add_file(&db, tmp.path(), "a.bin", &content);
    let b = add_file(&db, tmp.path(), "b.bin", &content);
    let mut other = content.clone();
    other[10_000] = 0xBB;
    let c = add_file(&db, tmp.path(), "c.bin", &other);

    // Head and tail agree for all three, so only the full hash tells c apart.
    let stats = Fingerprinter::new(&db, None, 4096)
        .run(&SilentReporter)
        .unwrap();
    assert_eq!(stats.full_hashed, 3);

    let (ra, rb, rc) = (record(&db, &a), record(&db, &b), record(&db, &c));
    assert_eq!(ra.hash_state, HashState::Complete);
    assert_eq!(ra.hash_full, rb.hash_full);
    assert!(ra.hash_full.is_some());
    assert_ne!(ra.hash_full, rc.hash_full);
    assert_eq!(db.duplicate_hashes().unwrap().len(), 1);
}

#[test]
fn test_zero_byte_files_hash_identically() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let a = add_file(&db, tmp.path(), "empty_a.bin", b"");
    let b = add_file(&db, tmp.path(), "empty_b.bin", b"");

    Fingerprinter::new(&db, None, 4096)
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(record(&db, &a).hash_full.as_deref(), Some(EMPTY_DIGEST));
    assert_eq!(record(&db, &b).hash_full.as_deref(), Some(EMPTY_DIGEST));
}

#[test]
fn test_rerun_does_no_extra_work() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    add_file(&db, tmp.path(), "a.bin", b"same bytes");
    add_file(&db, tmp.path(), "b.bin", b"same bytes");
    add_file(&db, tmp.path(), "c.bin", b"unique size here");

    let fingerprinter = Fingerprinter::new(&db, None, 4096);
    let first = fingerprinter.run(&SilentReporter).unwrap();
    assert_eq!(first.full_hashed, 2);

    let second = fingerprinter.run(&SilentReporter).unwrap();
    assert_eq!(second.unique_sizes, 0);
    assert_eq!(second.partial_hashed, 0);
    assert_eq!(second.full_hashed, 0);
}

#[test]
fn test_missing_file_is_isolated() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let a = add_file(&db, tmp.path(), "a.bin", b"same bytes");
    let b = add_file(&db, tmp.path(), "b.bin", b"same bytes");
    fs::remove_file(&b).unwrap();

    let stats = Fingerprinter::new(&db, None, 4096)
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(stats.read_failures, 1);
    assert_eq!(record(&db, &b).hash_partial, None);
    assert_eq!(record(&db, &a).hash_full, None);
}

#[test]
fn test_rerun_retries_failed_full_read() {
    let tmp = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let content = vec![3u8; 10_000];
    let a = add_file(&db, tmp.path(), "a.bin", &content);
    let b = add_file(&db, tmp.path(), "b.bin", &content);
    let (ra, rb) = (record(&db, &a), record(&db, &b));

    // a finished on an earlier pass; b's full read failed there.
    let partial = xxhash::partial_hash(Path::new(&a), content.len() as u64, 4096).unwrap();
    let full = xxhash::full_hash(Path::new(&a)).unwrap();
    db.set_partial_hashes(&[(ra.id, partial.clone()), (rb.id, partial)])
        .unwrap();
    db.set_full_hashes(&[(ra.id, full.clone())]).unwrap();

    let stats = Fingerprinter::new(&db, None, 4096)
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(stats.unique_partials, 0);
    assert_eq!(stats.full_hashed, 1);
    let rb = record(&db, &b);
    assert_eq!(rb.hash_state, HashState::Complete);
    assert_eq!(rb.hash_full.as_deref(), Some(full.as_str()));
}

#[test]
fn test_cache_hit_matches_recomputed_hash() {
    let tmp = tempdir().unwrap();
    let cache_path = tmp.path().join("lib").join(".media_hash_cache.db");
    let content = vec![7u8; 10_000];

    let first_db = Database::open_in_memory().unwrap();
    let a = add_file(&first_db, tmp.path(), "a.bin", &content);
    add_file(&first_db, tmp.path(), "b.bin", &content);
    let cache = HashCache::open(&cache_path).unwrap();
    let first = Fingerprinter::new(&first_db, Some(cache), 4096)
        .run(&SilentReporter)
        .unwrap();
    assert_eq!(first.cache_hits, 0);
    assert_eq!(HashCache::open(&cache_path).unwrap().count().unwrap(), 1);

    let second_db = Database::open_in_memory().unwrap();
    let a2 = add_file(&second_db, tmp.path(), "a.bin", &content);
    add_file(&second_db, tmp.path(), "b.bin", &content);
    let cache = HashCache::open(&cache_path).unwrap();
    let second = Fingerprinter::new(&second_db, Some(cache), 4096)
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(second.cache_hits, 2);
    assert_eq!(record(&first_db, &a).hash_full, record(&second_db, &a2).hash_full);
}

#[test]
fn test_conflicting_group_is_not_cached() {
    let tmp = tempdir().unwrap();
    let cache_path = tmp.path().join(".media_hash_cache.db");
    let db = Database::open_in_memory().unwrap();

    let content = vec![1u8; 20_000];
    let mut other = content.clone();
    other[9_000] = 2;
    add_file(&db, tmp.path(), "a.bin", &content);
    add_file(&db, tmp.path(), "b.bin", &other);

    let cache = HashCache::open(&cache_path).unwrap();
    Fingerprinter::new(&db, Some(cache), 4096)
        .run(&SilentReporter)
        .unwrap();

    assert_eq!(HashCache::open(&cache_path).unwrap().count().unwrap(), 0);
}
