// Copyright 2025 Linegrep Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Query compilation: the user's patterns become byte regexes plus the probe
//! set used against the suffix arrays. `fold_case` applies to the line
//! pattern only; file and tree filters are always case-sensitive.

use regex::bytes::{Regex, RegexBuilder};
use std::error::Error;
use std::fmt::{self, Display};

use crate::regex_analyze::{plan_probes, Probes};
use crate::types::Query;

#[derive(Debug)]
pub enum QueryError {
    BadLinePattern(regex::Error),
    BadFilePattern(regex::Error),
    BadTreePattern(regex::Error),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::BadLinePattern(e) => write!(f, "line pattern: {}", e),
            QueryError::BadFilePattern(e) => write!(f, "file pattern: {}", e),
            QueryError::BadTreePattern(e) => write!(f, "tree pattern: {}", e),
        }
    }
}

impl Error for QueryError {}

/// A compiled query, ready for the executor.
pub struct QueryPlan {
    pub(crate) line: Regex,
    pub(crate) file: Option<Regex>,
    pub(crate) tree: Option<Regex>,
    pub(crate) probes: Probes,
    pub(crate) max_matches: u32,
}

impl QueryPlan {
    pub fn compile(q: &Query) -> Result<QueryPlan, QueryError> {
        let line = RegexBuilder::new(&q.line)
            .case_insensitive(q.fold_case)
            .build()
            .map_err(QueryError::BadLinePattern)?;
        let file = match &q.file {
            Some(p) => Some(Regex::new(p).map_err(QueryError::BadFilePattern)?),
            None => None,
        };
        let tree = match &q.tree {
            Some(p) => Some(Regex::new(p).map_err(QueryError::BadTreePattern)?),
            None => None,
        };
        let probes = plan_probes(&q.line, q.fold_case);
        Ok(QueryPlan {
            line,
            file,
            tree,
            probes,
            max_matches: q.max_matches,
        })
    }

    pub fn probes(&self) -> &Probes {
        &self.probes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_line_pattern_is_reported() {
        let q = Query {
            line: "(".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            QueryPlan::compile(&q),
            Err(QueryError::BadLinePattern(_))
        ));
    }

    #[test]
    fn fold_case_compiles_insensitive_line_only() {
        let q = Query {
            line: "Foo".to_string(),
            file: Some("Bar".to_string()),
            fold_case: true,
            ..Default::default()
        };
        let plan = QueryPlan::compile(&q).unwrap();
        assert!(plan.line.is_match(b"fOO"));
        assert!(!plan.file.as_ref().unwrap().is_match(b"bar"));
    }
}
