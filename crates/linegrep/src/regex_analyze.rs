//! Regex analysis deriving required-literal probes for the suffix-array
//! prefilter. Every string the regex matches must contain one of the probes;
//! when that cannot be guaranteed the plan degrades to a full scan, which is
//! always safe.

use regex_syntax::hir::{self, Hir, HirKind, RepetitionKind, RepetitionRange};
use regex_syntax::Parser;

/// Shortest literal worth probing; anything shorter produces candidate sets
/// too dense to beat a scan.
pub const MIN_PROBE_LEN: usize = 3;

/// Under fold_case, literals are truncated to this many bytes before case
/// expansion, bounding the probe set at 2^4 variants per literal.
const FOLD_PROBE_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probes {
    /// Any line matching the regex contains at least one of these.
    Literals(Vec<Vec<u8>>),
    /// No usable literal could be extracted.
    FullScan,
}

/// Derive the probe set for `pattern`. For a top-level alternation every
/// branch must contribute a literal, yielding an or-of-probes plan; a single
/// unfilterable branch forces a full scan.
pub fn plan_probes(pattern: &str, fold_case: bool) -> Probes {
    let hir = match Parser::new().parse(pattern) {
        Ok(h) => h,
        Err(_) => return Probes::FullScan,
    };
    let mut probes: Vec<Vec<u8>> = Vec::new();
    match hir.kind() {
        HirKind::Alternation(alts) => {
            for alt in alts {
                match best_literal(alt).and_then(|l| expand_case(l, fold_case)) {
                    Some(v) => probes.extend(v),
                    None => return Probes::FullScan,
                }
            }
        }
        _ => match best_literal(&hir).and_then(|l| expand_case(l, fold_case)) {
            Some(v) => probes.extend(v),
            None => return Probes::FullScan,
        },
    }
    probes.sort();
    probes.dedup();
    if probes.is_empty() {
        Probes::FullScan
    } else {
        Probes::Literals(probes)
    }
}

/// The longest literal run required by `h`, if one of usable length exists.
fn best_literal(h: &Hir) -> Option<Vec<u8>> {
    let mut runs = collect_runs(h);
    runs.retain(|r| r.len() >= MIN_PROBE_LEN);
    runs.into_iter().max_by_key(|r| r.len())
}

fn singleton_byte(h: &Hir) -> Option<u8> {
    match h.kind() {
        HirKind::Literal(hir::Literal::Byte(b)) => Some(*b),
        HirKind::Class(hir::Class::Bytes(bs)) => {
            let mut it = bs.iter();
            let first = it.next()?;
            (it.next().is_none() && first.start() == first.end()).then(|| first.start())
        }
        HirKind::Class(hir::Class::Unicode(cu)) => {
            let mut it = cu.iter();
            let first = it.next()?;
            (it.next().is_none() && first.start() == first.end() && first.start().is_ascii())
                .then(|| first.start() as u8)
        }
        _ => None,
    }
}

/// Collect literal byte runs that must appear in every match of `h`.
/// Concatenations accumulate runs across fixed elements; alternations keep
/// only runs common to every branch; zero-occurrence repetitions contribute
/// nothing.
fn collect_runs(h: &Hir) -> Vec<Vec<u8>> {
    match h.kind() {
        HirKind::Literal(hir::Literal::Unicode(c)) => {
            let mut buf = [0u8; 4];
            vec![c.encode_utf8(&mut buf).as_bytes().to_vec()]
        }
        HirKind::Literal(hir::Literal::Byte(b)) => vec![vec![*b]],
        HirKind::Concat(list) => {
            let mut out: Vec<Vec<u8>> = Vec::new();
            let mut cur: Vec<u8> = Vec::new();
            for sub in list {
                if let HirKind::Literal(hir::Literal::Unicode(c)) = sub.kind() {
                    let mut buf = [0u8; 4];
                    cur.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    continue;
                }
                if let Some(b) = singleton_byte(sub) {
                    cur.push(b);
                    continue;
                }
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                out.extend(collect_runs(sub));
            }
            if !cur.is_empty() {
                out.push(cur);
            }
            out
        }
        HirKind::Alternation(list) => {
            let mut common: Option<std::collections::BTreeSet<Vec<u8>>> = None;
            for sub in list {
                let set: std::collections::BTreeSet<Vec<u8>> =
                    collect_runs(sub).into_iter().collect();
                common = Some(match common {
                    None => set,
                    Some(prev) => prev.intersection(&set).cloned().collect(),
                });
            }
            common.map(|s| s.into_iter().collect()).unwrap_or_default()
        }
        HirKind::Repetition(rep) => {
            let required = match rep.kind {
                RepetitionKind::OneOrMore => true,
                RepetitionKind::Range(RepetitionRange::Exactly(n)) => n >= 1,
                RepetitionKind::Range(RepetitionRange::AtLeast(n)) => n >= 1,
                RepetitionKind::Range(RepetitionRange::Bounded(n, _)) => n >= 1,
                RepetitionKind::ZeroOrOne | RepetitionKind::ZeroOrMore => false,
            };
            if required {
                collect_runs(&rep.hir)
            } else {
                Vec::new()
            }
        }
        HirKind::Group(g) => collect_runs(&g.hir),
        _ => Vec::new(),
    }
}

/// Case handling for one extracted literal. Case-sensitive literals pass
/// through. Under fold_case the literal is truncated to `FOLD_PROBE_LEN`
/// bytes and expanded to all ASCII case variants; a non-ASCII byte in the
/// truncated prefix makes byte probing unsound, so the literal is rejected
/// and the caller falls back to a full scan.
fn expand_case(mut lit: Vec<u8>, fold_case: bool) -> Option<Vec<Vec<u8>>> {
    if !fold_case {
        return Some(vec![lit]);
    }
    lit.truncate(FOLD_PROBE_LEN);
    if lit.iter().any(|b| !b.is_ascii()) {
        return None;
    }
    let mut out: Vec<Vec<u8>> = vec![Vec::with_capacity(lit.len())];
    for &b in &lit {
        if b.is_ascii_alphabetic() {
            out = out
                .into_iter()
                .flat_map(|p| {
                    let mut lo = p.clone();
                    lo.push(b.to_ascii_lowercase());
                    let mut up = p;
                    up.push(b.to_ascii_uppercase());
                    [lo, up]
                })
                .collect();
        } else {
            for p in &mut out {
                p.push(b);
            }
        }
    }
    Some(out)
}
