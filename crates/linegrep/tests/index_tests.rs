use linegrep::{CancelToken, CodeIndex, ExitReason, MatchStats, Query};

mod common;
use common::{line_query, run};

#[test]
fn duplicate_lines_share_one_span() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"foo\nbar\nfoo\n").unwrap();
    idx.finalize();

    let (matches, stats) = run(&idx, &line_query("foo"));
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].lno, 1);
    assert_eq!(matches[1].lno, 3);
    for m in &matches {
        assert_eq!(m.line, "foo");
        assert_eq!(m.bounds, (0, 3));
        assert_eq!(m.tree, "t1");
        assert_eq!(m.version, "v1");
    }
    assert_eq!(stats.why, ExitReason::None);

    // Lines 1 and 3 resolve to the same chunk span.
    let spans = idx.files()[0].content.lines();
    assert_eq!(spans[0], spans[2]);
    assert_ne!(spans[0], spans[1]);
}

#[test]
fn shared_line_across_files_claims_both_owners() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"hello\n").unwrap();
    idx.index_file(t, "b.txt", b"hello\n").unwrap();
    idx.finalize();

    let (matches, _) = run(&idx, &line_query("hello"));
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].path, "a.txt");
    assert_eq!(matches[1].path, "b.txt");

    // One span, one chunk-file record covering both files.
    assert_eq!(
        idx.files()[0].content.lines()[0],
        idx.files()[1].content.lines()[0]
    );
    let chunk = idx.alloc().chunk(0);
    let rec = &chunk.files()[0];
    assert!(rec.files.contains(&0) && rec.files.contains(&1));
}

#[test]
fn context_is_clipped_at_file_bounds() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"line1\nMATCH_HERE\nline3\n").unwrap();
    idx.finalize();

    let (matches, _) = run(&idx, &line_query("MATCH_HERE"));
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.lno, 2);
    assert_eq!(m.before, vec!["line1".to_string()]);
    assert_eq!(m.after, vec!["line3".to_string()]);
}

#[test]
fn no_matches_is_a_normal_exit() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"foo\nbar\nfoo\n").unwrap();
    idx.finalize();

    let (matches, stats) = run(&idx, &line_query("never"));
    assert!(matches.is_empty());
    assert_eq!(stats.matches, 0);
    assert_eq!(stats.why, ExitReason::None);
}

#[test]
fn match_cap_stops_early_and_reports_limit() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    for i in 0..1000 {
        let body = format!("needle number {}\n", i);
        idx.index_file(t, format!("f{}.txt", i), body.as_bytes())
            .unwrap();
    }
    idx.finalize();

    let q = Query {
        line: "needle".to_string(),
        max_matches: 10,
        ..Default::default()
    };
    let (matches, stats) = run(&idx, &q);
    assert_eq!(matches.len(), 10);
    assert_eq!(stats.matches, 10);
    assert_eq!(stats.why, ExitReason::MatchLimit);
}

#[test]
fn cap_equal_to_corpus_is_not_a_limit_exit() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"pin\npin again\nother\n").unwrap();
    idx.finalize();

    let q = Query {
        line: "pin".to_string(),
        max_matches: 2,
        ..Default::default()
    };
    let (matches, stats) = run(&idx, &q);
    assert_eq!(matches.len(), 2);
    assert_eq!(stats.why, ExitReason::None);
}

#[test]
fn leftmost_match_only_per_line() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"foo then foo again\n").unwrap();
    idx.finalize();

    let (matches, _) = run(&idx, &line_query("foo"));
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].bounds, (0, 3));
}

#[test]
fn reconstruction_is_byte_exact_modulo_trailing_newline() {
    let mut idx = CodeIndex::with_chunk_size(32);
    let t = idx.open_tree("t1", None, "v1").unwrap();
    let inputs: Vec<(&str, &[u8])> = vec![
        ("trailing.txt", b"alpha\nbeta\ngamma\n"),
        ("no_trailing.txt", b"alpha\nbeta\ngamma"),
        ("blanks.txt", b"\n\nmiddle\n\n"),
        ("empty.txt", b""),
        ("shared.txt", b"alpha\nalpha\nbeta\n"),
    ];
    for (path, bytes) in &inputs {
        idx.index_file(t, *path, bytes).unwrap();
    }
    idx.finalize();

    for (i, (_, bytes)) in inputs.iter().enumerate() {
        let rebuilt = idx.files()[i].content.reconstruct(idx.alloc());
        let mut expect = bytes.to_vec();
        if !expect.is_empty() && expect.last() != Some(&b'\n') {
            expect.push(b'\n');
        }
        assert_eq!(rebuilt, expect, "file {} did not round-trip", i);
    }
}

#[test]
fn sequence_numbers_are_dense_and_monotone() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    for i in 0..10 {
        idx.index_file(t, format!("f{}", i), b"x\n").unwrap();
    }
    idx.finalize();
    for (i, f) in idx.files().iter().enumerate() {
        assert_eq!(f.no as usize, i);
    }
}

#[test]
fn matches_found_across_chunk_rotation() {
    // Tiny chunks force the corpus across many chunk boundaries.
    let mut idx = CodeIndex::with_chunk_size(24);
    let t = idx.open_tree("t1", None, "v1").unwrap();
    let mut body = String::new();
    for i in 0..200 {
        body.push_str(&format!("row {:03} target\n", i));
    }
    idx.index_file(t, "big.txt", body.as_bytes()).unwrap();
    idx.finalize();
    assert!(idx.alloc().chunks().len() > 1);

    let (matches, _) = run(&idx, &line_query("target"));
    assert_eq!(matches.len(), 200);
    // Context crosses chunk boundaries: every interior match has neighbors.
    let mid = matches.iter().find(|m| m.lno == 100).unwrap();
    assert_eq!(mid.before.len(), 3);
    assert_eq!(mid.after.len(), 3);
    assert_eq!(mid.before[2], "row 098 target");
    assert_eq!(mid.after[0], "row 100 target");
}

#[test]
fn fold_case_applies_to_line_only() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("Repo", None, "v1").unwrap();
    idx.index_file(t, "CaseFile.txt", b"Mixed Needle Here\n").unwrap();
    idx.finalize();

    let q = Query {
        line: "nEEdle".to_string(),
        fold_case: true,
        ..Default::default()
    };
    let (matches, _) = run(&idx, &q);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].bounds, (6, 12));

    // File filter stays case-sensitive even when the line folds.
    let q = Query {
        line: "needle".to_string(),
        file: Some("casefile".to_string()),
        fold_case: true,
        ..Default::default()
    };
    let (matches, _) = run(&idx, &q);
    assert!(matches.is_empty());
}

#[test]
fn tree_and_file_filters_restrict_results() {
    let mut idx = CodeIndex::new();
    let t1 = idx.open_tree("alpha", None, "v1").unwrap();
    let t2 = idx.open_tree("beta", None, "v1").unwrap();
    idx.index_file(t1, "src/x.rs", b"shared token\n").unwrap();
    idx.index_file(t2, "doc/x.md", b"shared token\n").unwrap();
    idx.finalize();

    let q = Query {
        line: "shared".to_string(),
        tree: Some("^alpha$".to_string()),
        ..Default::default()
    };
    let (matches, _) = run(&idx, &q);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].tree, "alpha");

    let q = Query {
        line: "shared".to_string(),
        file: Some(r"\.md$".to_string()),
        ..Default::default()
    };
    let (matches, _) = run(&idx, &q);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].path, "doc/x.md");
}

#[test]
fn full_scan_plan_still_finds_matches() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"axb\nayb\nzzz\n").unwrap();
    idx.finalize();

    // "a.b" yields no usable literal; the scanner must fall back cleanly.
    let (matches, _) = run(&idx, &line_query("a.b"));
    assert_eq!(matches.len(), 2);
}

#[test]
fn empty_lines_are_searchable() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"first\n\nthird\n").unwrap();
    idx.finalize();

    let (matches, _) = run(&idx, &line_query("^$"));
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].lno, 2);
    assert_eq!(matches[0].line, "");
    assert_eq!(matches[0].bounds, (0, 0));
}

#[test]
fn pre_cancelled_query_exits_with_timeout() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"needle\n").unwrap();
    idx.finalize();

    let token = CancelToken::new();
    token.cancel_timeout();
    let mut stats = MatchStats::default();
    idx.match_with_cancel(&line_query("needle"), &token, &mut |_| {}, &mut stats)
        .unwrap();
    assert_eq!(stats.matches, 0);
    assert_eq!(stats.why, ExitReason::Timeout);
}

#[test]
fn ingest_after_finalize_is_rejected() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"x\n").unwrap();
    idx.finalize();
    assert!(idx.index_file(t, "b.txt", b"y\n").is_err());
    assert!(idx.open_tree("t2", None, "v1").is_err());
}

#[test]
fn open_tree_is_idempotent_per_name_version() {
    let mut idx = CodeIndex::new();
    let a = idx.open_tree("t", None, "v1").unwrap();
    let b = idx.open_tree("t", None, "v1").unwrap();
    let c = idx.open_tree("t", None, "v2").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(idx.trees().len(), 2);
}

#[test]
fn invalid_pattern_is_an_error_not_empty_results() {
    let mut idx = CodeIndex::new();
    let t = idx.open_tree("t1", None, "v1").unwrap();
    idx.index_file(t, "a.txt", b"x\n").unwrap();
    idx.finalize();

    let mut stats = MatchStats::default();
    let err = idx.match_query(&line_query("(unclosed"), &mut |_| {}, &mut stats);
    assert!(err.is_err());
}
