use media_consolidator::storage::models::{Disposition, HashState, InventoryEntry};
use media_consolidator::storage::Database;

fn entry(path: &str, size: u64) -> InventoryEntry {
    InventoryEntry {
        path: path.to_string(),
        size,
        extension: ".jpg".to_string(),
        created_at: 1704110400.0,
        modified_at: 1704110400.0,
    }
}

#[test]
fn test_open_in_memory() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.count_records().unwrap(), 0);
}

#[test]
fn test_open_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::open(path).unwrap();
        db.insert_inventory(&[entry("/a/one.jpg", 10)]).unwrap();
    }
    let db = Database::open(path).unwrap();
    assert_eq!(db.count_records().unwrap(), 1);
}

#[test]
fn test_insert_inventory_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let batch = vec![entry("/a/one.jpg", 10), entry("/a/two.jpg", 20)];

    assert_eq!(db.insert_inventory(&batch).unwrap(), 2);
    assert_eq!(db.insert_inventory(&batch).unwrap(), 0);
    assert_eq!(db.count_records().unwrap(), 2);

    let record = db.get_record_by_path("/a/two.jpg").unwrap().unwrap();
    assert_eq!(record.size, 20);
    assert_eq!(record.hash_state, HashState::Unprocessed);
    assert_eq!(record.disposition, None);
    assert_eq!(record.file_name(), "two.jpg");
    assert_eq!(record.parent_dir(), "/a");
}

#[test]
fn test_wipe_resets_records_and_ids() {
    let db = Database::open_in_memory().unwrap();
    db.insert_inventory(&[entry("/a/one.jpg", 10), entry("/a/two.jpg", 20)])
        .unwrap();
    db.wipe().unwrap();
    assert_eq!(db.count_records().unwrap(), 0);

    db.insert_inventory(&[entry("/b/three.jpg", 30)]).unwrap();
    let record = db.get_record_by_path("/b/three.jpg").unwrap().unwrap();
    assert_eq!(record.id, 1);
}

#[test]
fn test_disposition_counts() {
    let db = Database::open_in_memory().unwrap();
    db.insert_inventory(&[
        entry("/a/one.jpg", 10),
        entry("/a/two.jpg", 10),
        entry("/a/three.jpg", 30),
    ])
    .unwrap();
    db.set_dispositions(&[(1, Disposition::Keep), (2, Disposition::Delete)])
        .unwrap();
    db.set_target_paths(&[(1, "/lib/2024/2024-01/one.jpg".to_string())])
        .unwrap();

    let counts = db.disposition_counts().unwrap();
    assert_eq!(counts.total, 3);
    assert_eq!(counts.keeps, 1);
    assert_eq!(counts.deletes, 1);
    assert_eq!(counts.unset, 1);
    assert_eq!(counts.keeps_without_target, 0);

    assert_eq!(db.keep_all_unset().unwrap(), 1);
    let counts = db.disposition_counts().unwrap();
    assert_eq!(counts.unset, 0);
    assert_eq!(counts.keeps_without_target, 1);
}

#[test]
fn test_deletes_with_winner_joins_keeper_target() {
    let db = Database::open_in_memory().unwrap();
    db.insert_inventory(&[
        entry("/a/one.jpg", 10),
        entry("/b/one.jpg", 10),
        entry("/c/orphan.jpg", 30),
    ])
    .unwrap();
    db.set_full_hashes(&[
        (1, "aaaa".to_string()),
        (2, "aaaa".to_string()),
        (3, "bbbb".to_string()),
    ])
    .unwrap();
    db.set_dispositions(&[
        (1, Disposition::Keep),
        (2, Disposition::Delete),
        (3, Disposition::Delete),
    ])
    .unwrap();
    db.set_target_paths(&[(1, "/lib/2024/2024-01/one.jpg".to_string())])
        .unwrap();

    let deletes = db.deletes_with_winner().unwrap();
    assert_eq!(deletes.len(), 2);
    assert_eq!(deletes[0].0.path, "/b/one.jpg");
    assert_eq!(deletes[0].1.as_deref(), Some("/lib/2024/2024-01/one.jpg"));
    assert_eq!(deletes[1].0.path, "/c/orphan.jpg");
    assert_eq!(deletes[1].1, None);
}

#[test]
fn test_keep_records_orders_organized_first() {
    let db = Database::open_in_memory().unwrap();
    db.insert_inventory(&[
        entry("/src/Img.jpg", 10),
        entry("/lib/2024/2024-01/2024-01-01_Img.jpg", 20),
    ])
    .unwrap();
    db.keep_all_unset().unwrap();

    let keeps = db.keep_records("/lib").unwrap();
    assert_eq!(keeps[0].path, "/lib/2024/2024-01/2024-01-01_Img.jpg");
    assert_eq!(keeps[1].path, "/src/Img.jpg");
}

#[test]
fn test_reserved_ids_continue_after_wipe() {
    let db = Database::open_in_memory().unwrap();
    db.insert_inventory(&[entry("/a/one.jpg", 10)]).unwrap();
    db.wipe().unwrap();
    db.reserve_ids_through(41).unwrap();

    db.insert_inventory(&[entry("/b/two.jpg", 20), entry("/b/three.jpg", 30)])
        .unwrap();
    assert_eq!(db.get_record_by_path("/b/two.jpg").unwrap().unwrap().id, 42);
    assert_eq!(db.get_record_by_path("/b/three.jpg").unwrap().unwrap().id, 43);
}

#[test]
fn test_unique_partial_counts_completed_siblings() {
    let db = Database::open_in_memory().unwrap();
    db.insert_inventory(&[entry("/a/one.jpg", 10), entry("/b/one.jpg", 10)])
        .unwrap();
    db.set_partial_hashes(&[(1, "pppp".to_string()), (2, "pppp".to_string())])
        .unwrap();
    // Record 2's full read failed on an earlier pass.
    db.set_full_hashes(&[(1, "ffff".to_string())]).unwrap();

    assert_eq!(db.mark_unique_partials().unwrap(), 0);
    let retry = db.get_record(2).unwrap().unwrap();
    assert_eq!(retry.hash_state, HashState::Unprocessed);
    assert_eq!(db.full_hash_candidates().unwrap().len(), 1);
}

#[test]
fn test_deleted_paths_under_target_root() {
    let db = Database::open_in_memory().unwrap();
    db.insert_inventory(&[
        entry("/lib/2024/2024-01/one.jpg", 10),
        entry("/src/one.jpg", 10),
        entry("/lib/2024/2024-01/two.jpg", 20),
    ])
    .unwrap();
    db.set_dispositions(&[
        (1, Disposition::Delete),
        (2, Disposition::Delete),
        (3, Disposition::Keep),
    ])
    .unwrap();

    assert_eq!(
        db.deleted_paths_under("/lib").unwrap(),
        vec!["/lib/2024/2024-01/one.jpg".to_string()]
    );
}
