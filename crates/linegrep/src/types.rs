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

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::content::ContentHandle;

pub type TreeId = u32;
pub type FileId = u32;

/// A named, versioned collection of indexed files, typically one revision of
/// one repository. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub name: String,
    pub version: String,
    /// Opaque metadata carried through to query front-ends.
    pub metadata: Option<serde_json::Value>,
}

/// A single indexed file. Belongs to exactly one tree; `no` is the dense
/// sequence number assigned in ingest order.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub tree: TreeId,
    pub path: String,
    pub no: FileId,
    pub content: ContentHandle,
}

/// One line of a file as a view into a chunk: `len` bytes starting at `off`,
/// not counting the newline the chunk stores after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub chunk: u32,
    pub off: u32,
    pub len: u32,
}

/// A search request. `line` is the only required pattern; `file` and `tree`
/// are optional filters matched against file paths and tree names. Both
/// filters are always case-sensitive; `fold_case` applies to `line` only.
/// `max_matches == 0` means unlimited.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub line: String,
    pub file: Option<String>,
    pub tree: Option<String>,
    pub fold_case: bool,
    pub max_matches: u32,
}

/// One match delivered to the result callback. Line and context fields are
/// views into chunk data, valid for the lifetime of the index borrow.
#[derive(Debug)]
pub struct MatchResult<'a> {
    pub tree: &'a Tree,
    pub file: &'a IndexedFile,
    /// 1-based line number within the file.
    pub line_number: u32,
    pub line: &'a [u8],
    /// Byte bounds of the leftmost regex match within `line`.
    pub match_left: u32,
    pub match_right: u32,
    /// Up to `CONTEXT_LINES` preceding lines, in file order.
    pub context_before: Vec<&'a [u8]>,
    pub context_after: Vec<&'a [u8]>,
}

/// Why a query stopped producing results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitReason {
    /// The whole corpus was scanned.
    #[default]
    None,
    /// The query was cancelled on a deadline.
    Timeout,
    /// The match cap was reached with matches left over.
    MatchLimit,
}

/// Per-query phase timings and outcome, filled in by `match_query`.
#[derive(Debug, Clone, Default)]
pub struct MatchStats {
    pub matches: u32,
    /// Time spent evaluating the line regex on candidate lines.
    pub regex_time: Duration,
    /// Time spent sorting and deduplicating candidate offsets.
    pub sort_time: Duration,
    /// Time spent probing suffix arrays.
    pub index_time: Duration,
    /// Time spent compiling the plan and extracting probe literals.
    pub analyze_time: Duration,
    pub why: ExitReason,
}
