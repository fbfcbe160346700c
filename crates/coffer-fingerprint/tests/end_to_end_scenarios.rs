// End-to-end scenarios exercised through the public API only: build a
// database against a real temp directory, scan, diff, and observe.

use coffer_fingerprint::Database;
use coffer_scan::scan;
use std::fs;
use std::path::Path;

fn fresh_db(base: &Path) -> Database {
    Database::new(base.to_path_buf())
}

#[test]
fn e1_first_run_discovers_and_archives_the_only_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello\n").unwrap();

    let mut db = fresh_db(dir.path());
    let inv = scan(dir.path());
    let (new, updated) = db.diff(&inv.files).unwrap();
    assert_eq!(new.len(), 1);
    assert!(updated.is_empty());

    db.update_meta(&inv.files).unwrap();
    assert_eq!(db.len(), 1);

    let db_path = dir.path().join("fingerprints.db");
    db.save_atomic(&db_path).unwrap();
    let reloaded = Database::load_or_new(dir.path().to_path_buf(), &db_path).unwrap();
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn e2_unchanged_rerun_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello\n").unwrap();
    let mut db = fresh_db(dir.path());
    db.update_meta(&scan(dir.path()).files).unwrap();

    let inv2 = scan(dir.path());
    let (new, updated) = db.diff(&inv2.files).unwrap();
    let deleted = db.deletions(&inv2.files);
    assert!(new.is_empty());
    assert!(updated.is_empty());
    assert!(deleted.is_empty());
}

#[test]
fn e3_overwriting_the_file_is_detected_as_altered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, b"hello\n").unwrap();
    let mut db = fresh_db(dir.path());
    db.update_meta(&scan(dir.path()).files).unwrap();

    fs::write(&path, b"world\n").unwrap();
    let inv2 = scan(dir.path());
    let (new, updated) = db.diff(&inv2.files).unwrap();
    assert!(new.is_empty());
    assert_eq!(updated.len(), 1);
    let altered = db.altered(&updated, &inv2.files, None).unwrap();
    assert_eq!(altered, updated);
}

#[test]
fn e4_touching_the_file_updates_metadata_without_archiving() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, b"hello\n").unwrap();
    let mut db = fresh_db(dir.path());
    db.update_meta(&scan(dir.path()).files).unwrap();

    let now = std::time::SystemTime::now() + std::time::Duration::from_secs(2);
    let atime = filetime::FileTime::from_system_time(now);
    filetime::set_file_times(&path, atime, atime).unwrap();

    let inv2 = scan(dir.path());
    let (new, updated) = db.diff(&inv2.files).unwrap();
    assert!(new.is_empty());
    assert_eq!(updated.len(), 1);
    let altered = db.altered(&updated, &inv2.files, None).unwrap();
    assert!(altered.is_empty());
}

#[test]
fn e5_deleting_the_file_empties_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, b"hello\n").unwrap();
    let mut db = fresh_db(dir.path());
    db.update_meta(&scan(dir.path()).files).unwrap();

    fs::remove_file(&path).unwrap();
    let inv2 = scan(dir.path());
    let deleted = db.deletions(&inv2.files);
    assert_eq!(deleted.len(), 1);

    db.update_meta(&inv2.files).unwrap();
    assert!(db.is_empty());
}

#[test]
fn property_8_running_twice_with_no_changes_archives_only_once() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello\n").unwrap();
    let db_path = dir.path().join("fingerprints.db");

    let mut first = Database::load_or_new(dir.path().to_path_buf(), &db_path).unwrap();
    let inv = scan(dir.path());
    let (new, _) = first.diff(&inv.files).unwrap();
    assert_eq!(new.len(), 1, "first run must discover the file exactly once");
    first.update_meta(&inv.files).unwrap();
    first.save_atomic(&db_path).unwrap();

    let second = Database::load_or_new(dir.path().to_path_buf(), &db_path).unwrap();
    let inv2 = scan(dir.path());
    let (new2, updated2) = second.diff(&inv2.files).unwrap();
    assert!(new2.is_empty());
    assert!(updated2.is_empty());
}
