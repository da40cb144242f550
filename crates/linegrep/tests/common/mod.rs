use linegrep::{CodeIndex, MatchResult, MatchStats, Query};

/// Owned copy of a match for assertions after the borrow ends.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Owned {
    pub path: String,
    pub lno: u32,
    pub line: String,
    pub bounds: (u32, u32),
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub tree: String,
    pub version: String,
}

impl Owned {
    fn from(m: &MatchResult<'_>) -> Self {
        let text = |b: &[u8]| String::from_utf8_lossy(b).into_owned();
        Owned {
            path: m.file.path.clone(),
            lno: m.line_number,
            line: text(m.line),
            bounds: (m.match_left, m.match_right),
            before: m.context_before.iter().map(|l| text(l)).collect(),
            after: m.context_after.iter().map(|l| text(l)).collect(),
            tree: m.tree.name.clone(),
            version: m.tree.version.clone(),
        }
    }
}

/// Run a query, collecting matches sorted by (path, lno) since cross-chunk
/// order is unspecified.
pub fn run(idx: &CodeIndex, q: &Query) -> (Vec<Owned>, MatchStats) {
    let mut out: Vec<Owned> = Vec::new();
    let mut stats = MatchStats::default();
    idx.match_query(
        q,
        &mut |m: &MatchResult<'_>| out.push(Owned::from(m)),
        &mut stats,
    )
    .expect("query should compile");
    out.sort();
    (out, stats)
}

pub fn line_query(pattern: &str) -> Query {
    Query {
        line: pattern.to_string(),
        ..Default::default()
    }
}
