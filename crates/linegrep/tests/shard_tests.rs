use linegrep::{CodeIndex, ExitReason};

mod common;
use common::{line_query, run};

fn sample_index() -> CodeIndex {
    let mut idx = CodeIndex::new();
    idx.set_name("sample");
    let t = idx
        .open_tree("t1", Some(serde_json::json!({"url": "http://example.invalid"})), "v1")
        .unwrap();
    idx.index_file(t, "a.txt", b"foo\nbar\nfoo\n").unwrap();
    idx.index_file(t, "b.txt", b"bar\nbaz\n").unwrap();
    idx.finalize();
    idx
}

#[test]
fn dump_load_returns_identical_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.idx");
    let idx = sample_index();
    idx.dump(&path).unwrap();

    let loaded = CodeIndex::load(&path).unwrap();
    assert_eq!(loaded.name(), "sample");
    assert_eq!(loaded.trees().len(), 1);
    assert_eq!(
        loaded.trees()[0].metadata.as_ref().unwrap()["url"],
        "http://example.invalid"
    );
    assert!(loaded.finalized());

    for pattern in ["foo", "bar", "ba.", "never"] {
        let (orig, _) = run(&idx, &line_query(pattern));
        let (re, stats) = run(&loaded, &line_query(pattern));
        assert_eq!(orig, re, "results differ for {:?}", pattern);
        assert_eq!(stats.why, ExitReason::None);
    }
}

#[test]
fn load_rejects_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.idx");
    std::fs::write(&path, b"this is not an index file at all, not even close")
        .unwrap();
    let err = CodeIndex::load(&path).unwrap_err();
    assert!(err.to_string().contains("bad magic"), "{}", err);
}

#[test]
fn load_rejects_version_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.idx");
    sample_index().dump(&path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let err = CodeIndex::load(&path).unwrap_err();
    assert!(
        err.to_string().contains("unsupported index version"),
        "{}",
        err
    );
}

#[test]
fn load_rejects_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.idx");
    sample_index().dump(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(CodeIndex::load(&path).is_err());
}

#[test]
fn load_rejects_tiny_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.idx");
    std::fs::write(&path, b"LGRP").unwrap();
    let err = CodeIndex::load(&path).unwrap_err();
    assert!(err.to_string().contains("truncated"), "{}", err);
}

#[test]
fn dump_before_finalize_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("early.idx");
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t", None, "v").unwrap();
    idx.index_file(t, "a.txt", b"x\n").unwrap();
    assert!(idx.dump(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn loaded_index_rejects_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.idx");
    sample_index().dump(&path).unwrap();
    let mut loaded = CodeIndex::load(&path).unwrap();
    assert!(loaded.open_tree("t2", None, "v2").is_err());
}

#[test]
fn empty_index_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.idx");
    let mut idx = CodeIndex::new();
    idx.finalize();
    idx.dump(&path).unwrap();
    let loaded = CodeIndex::load(&path).unwrap();
    let (matches, _) = run(&loaded, &line_query("anything"));
    assert!(matches.is_empty());
}
