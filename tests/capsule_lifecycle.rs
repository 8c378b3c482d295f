//! Integration tests for the container session lifecycle

use capsule_fs::{Capsule, CapsuleError, RESERVED_BLOCKS};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Write a host file with the given content and return its path
fn host_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn download_bytes(capsule: &mut Capsule, name: &str, dir: &Path) -> Vec<u8> {
    let dest = dir.join(format!("dl-{name}"));
    capsule.download(name, &dest).unwrap();
    std::fs::read(&dest).unwrap()
}

#[test]
fn test_add_then_exists_then_remove() {
    let dir = tempdir().unwrap();
    let source = host_file(&dir, "x.txt", b"some content");
    let mut capsule = Capsule::create(16, dir.path().join("c.cap")).unwrap();

    assert!(!capsule.exists("x.txt"));
    capsule.add_file(&source).unwrap();
    assert!(capsule.exists("x.txt"));

    capsule.remove("x.txt").unwrap();
    assert!(!capsule.exists("x.txt"));
    assert_eq!(capsule.stats().blocks_used, RESERVED_BLOCKS);
}

#[test]
fn test_close_then_open_round_trip() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("roundtrip.cap");
    let source = host_file(&dir, "f.bin", &vec![0x5A; 2500]);

    {
        let mut capsule = Capsule::create(20, &container).unwrap();
        capsule.add_file(&source).unwrap();
        capsule.close().unwrap();
    }

    let capsule = Capsule::open(&container).unwrap();
    let files = capsule.list_files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "f.bin");
    assert_eq!(files[0].begin, RESERVED_BLOCKS);
    assert_eq!(files[0].byte_len, 2500);
    assert_eq!(files[0].blocks, 3);
}

#[test]
fn test_download_returns_exact_content() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    let source = host_file(&dir, "data.bin", &content);

    let mut capsule = Capsule::create(32, dir.path().join("dl.cap")).unwrap();
    capsule.add_file(&source).unwrap();

    // Exactly byte_len bytes come back, not the padded block tail.
    assert_eq!(download_bytes(&mut capsule, "data.bin", dir.path()), content);
}

#[test]
fn test_download_survives_close_and_reopen() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("persist.cap");
    let content = b"durable after reopen".to_vec();
    let source = host_file(&dir, "keep.txt", &content);

    {
        let mut capsule = Capsule::create(16, &container).unwrap();
        capsule.add_file(&source).unwrap();
        capsule.close().unwrap();
    }

    let mut capsule = Capsule::open(&container).unwrap();
    assert_eq!(download_bytes(&mut capsule, "keep.txt", dir.path()), content);
}

#[test]
fn test_duplicate_add_fails() {
    let dir = tempdir().unwrap();
    let source = host_file(&dir, "dup.txt", b"first");
    let mut capsule = Capsule::create(16, dir.path().join("dup.cap")).unwrap();

    capsule.add_file(&source).unwrap();
    assert!(matches!(
        capsule.add_file(&source),
        Err(CapsuleError::NameConflict(name)) if name == "dup.txt"
    ));
}

#[test]
fn test_remove_and_download_unknown_name_fail() {
    let dir = tempdir().unwrap();
    let mut capsule = Capsule::create(16, dir.path().join("none.cap")).unwrap();

    assert!(matches!(
        capsule.remove("ghost"),
        Err(CapsuleError::NameNotFound(_))
    ));
    assert!(matches!(
        capsule.download("ghost", dir.path().join("out")),
        Err(CapsuleError::NameNotFound(_))
    ));
}

#[test]
fn test_rename_then_reuse_old_name() {
    let dir = tempdir().unwrap();
    let first = host_file(&dir, "4.txt", b"the original four");
    let mut capsule = Capsule::create(32, dir.path().join("rename.cap")).unwrap();

    capsule.add_file(&first).unwrap();
    capsule.rename("4.txt", "10.txt").unwrap();

    // The old name is free again; a new, independent item can take it.
    std::fs::write(&first, b"a brand new four").unwrap();
    capsule.add_file(&first).unwrap();

    assert_eq!(capsule.list_files().len(), 2);
    assert_eq!(
        download_bytes(&mut capsule, "10.txt", dir.path()),
        b"the original four"
    );
    assert_eq!(
        download_bytes(&mut capsule, "4.txt", dir.path()),
        b"a brand new four"
    );
}

#[test]
fn test_rename_to_taken_name_fails() {
    let dir = tempdir().unwrap();
    let a = host_file(&dir, "a.txt", b"a");
    let b = host_file(&dir, "b.txt", b"b");
    let mut capsule = Capsule::create(16, dir.path().join("taken.cap")).unwrap();

    capsule.add_file(&a).unwrap();
    capsule.add_file(&b).unwrap();

    assert!(matches!(
        capsule.rename("a.txt", "b.txt"),
        Err(CapsuleError::NameConflict(_))
    ));
    assert!(matches!(
        capsule.rename("missing.txt", "c.txt"),
        Err(CapsuleError::NameNotFound(_))
    ));
}

#[test]
fn test_overlong_name_is_rejected() {
    let dir = tempdir().unwrap();
    let source = host_file(&dir, &"n".repeat(60), b"payload");
    let mut capsule = Capsule::create(16, dir.path().join("long.cap")).unwrap();

    assert!(matches!(
        capsule.add_file(&source),
        Err(CapsuleError::InvalidName(_))
    ));
    assert!(capsule.list_files().is_empty());
}

#[test]
fn test_open_rejects_misaligned_container() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.cap");
    std::fs::write(&path, vec![0u8; 10_000]).unwrap();

    assert!(matches!(
        Capsule::open(&path),
        Err(CapsuleError::CorruptContainer(_))
    ));
}
