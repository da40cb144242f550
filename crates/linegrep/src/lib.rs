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

//! In-memory regex search over large source corpora. Files are packed into
//! shared chunks with per-line deduplication; each chunk carries a suffix
//! array so a regex query reduces to a handful of substring probes plus a
//! confirming scan of candidate lines.

pub mod chunk;
pub mod content;
pub mod index;
pub mod query;
pub mod regex_analyze;
pub mod search;
pub mod types;

mod dedup;
mod shard;

// Flat re-exports for callers that prefer a small import surface.
pub use crate::chunk::ChunkAllocator;
pub use crate::index::{index_filesystem, index_repository, CodeIndex, IndexError, RepoSpec};
pub use crate::query::{QueryError, QueryPlan};
pub use crate::search::{CancelToken, CONTEXT_LINES};
pub use crate::types::{
    ExitReason, FileId, IndexedFile, MatchResult, MatchStats, Query, Span, Tree, TreeId,
};
