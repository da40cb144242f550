use linegrep::regex_analyze::{plan_probes, Probes, MIN_PROBE_LEN};
use linegrep::{Query, QueryPlan};

fn probes_of(pattern: &str, fold_case: bool) -> Vec<Vec<u8>> {
    match plan_probes(pattern, fold_case) {
        Probes::Literals(v) => v,
        Probes::FullScan => panic!("expected literal probes for {:?}", pattern),
    }
}

#[test]
fn probes_meet_the_minimum_length() {
    for pattern in ["needle", "foo_bar|baz_qux", r"prefix\d+suffix"] {
        for p in probes_of(pattern, false) {
            assert!(p.len() >= MIN_PROBE_LEN, "short probe {:?}", p);
        }
    }
}

#[test]
fn every_alternation_branch_contributes() {
    let probes = probes_of("alpha|bravo|charlie", false);
    for lit in [&b"alpha"[..], b"bravo", b"charlie"] {
        assert!(probes.iter().any(|p| p == lit), "missing {:?}", lit);
    }
}

#[test]
fn escaped_metacharacters_join_literal_runs() {
    let probes = probes_of(r"foo\.bar", false);
    assert_eq!(probes, vec![b"foo.bar".to_vec()]);
}

#[test]
fn compiled_plan_exposes_its_probe_set() {
    let q = Query {
        line: "static_assert".to_string(),
        ..Default::default()
    };
    let plan = QueryPlan::compile(&q).unwrap();
    match plan.probes() {
        Probes::Literals(v) => assert_eq!(v, &vec![b"static_assert".to_vec()]),
        Probes::FullScan => panic!("expected literals"),
    }
}

#[test]
fn probe_set_under_fold_case_is_bounded() {
    let probes = probes_of("Identifier", true);
    assert!(probes.len() <= 16);
    for p in &probes {
        assert!(p.len() <= 4);
        assert!(p.len() >= MIN_PROBE_LEN);
    }
}

#[test]
fn unanchorable_patterns_scan_everything() {
    for pattern in [r"\w+", "a?b?c?", "[0-9]{4}", ".."] {
        assert_eq!(
            plan_probes(pattern, false),
            Probes::FullScan,
            "pattern {:?}",
            pattern
        );
    }
}
