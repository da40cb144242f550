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

//! The index proper: tree/file catalog, line ingestion, and the
//! finalize/dump/load lifecycle. Build is sequential; after `finalize` the
//! whole structure is immutable and freely shared across query workers.

use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::chunk::{ChunkAllocator, ChunkFile, DEFAULT_CHUNK_SIZE};
use crate::content::ContentHandle;
use crate::dedup::{LineEntry, LineTable};
use crate::shard;
use crate::types::{FileId, IndexedFile, Span, Tree, TreeId};

mod error;
pub use error::IndexError;

/// Files larger than this are skipped by both walkers; they are
/// overwhelmingly generated or binary artifacts.
pub(crate) const MAX_FILE_SIZE: u64 = 8 << 20;

mod fs_walk;
pub use fs_walk::index_filesystem;

mod git_walk;
pub use git_walk::{index_repository, RepoSpec};

#[derive(Debug)]
pub struct CodeIndex {
    name: String,
    trees: Vec<Tree>,
    files: Vec<IndexedFile>,
    alloc: ChunkAllocator,
    lines: LineTable,
    finalized: bool,
}

impl Default for CodeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeIndex {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: u32) -> Self {
        CodeIndex {
            name: String::new(),
            trees: Vec::new(),
            files: Vec::new(),
            alloc: ChunkAllocator::new_heap(chunk_size),
            lines: LineTable::default(),
            finalized: false,
        }
    }

    pub(crate) fn from_parts(
        name: String,
        trees: Vec<Tree>,
        files: Vec<IndexedFile>,
        alloc: ChunkAllocator,
    ) -> Self {
        CodeIndex {
            name,
            trees,
            files,
            alloc,
            lines: LineTable::default(),
            finalized: true,
        }
    }

    /// Register a tree. Idempotent per `(name, version)`: re-opening an
    /// existing tree returns its id and leaves the stored metadata alone.
    pub fn open_tree(
        &mut self,
        name: &str,
        metadata: Option<serde_json::Value>,
        version: &str,
    ) -> Result<TreeId, IndexError> {
        if self.finalized {
            return Err(IndexError::AlreadyFinalized);
        }
        if let Some(i) = self
            .trees
            .iter()
            .position(|t| t.name == name && t.version == version)
        {
            return Ok(i as TreeId);
        }
        self.trees.push(Tree {
            name: name.to_string(),
            version: version.to_string(),
            metadata,
        });
        Ok((self.trees.len() - 1) as TreeId)
    }

    /// Split `bytes` into lines and append them to the chunk store,
    /// deduplicating against every line indexed so far. A missing final
    /// newline is implied; an empty input indexes a file with no lines.
    pub fn index_file(
        &mut self,
        tree: TreeId,
        path: impl Into<String>,
        bytes: &[u8],
    ) -> Result<(), IndexError> {
        if self.finalized {
            return Err(IndexError::AlreadyFinalized);
        }
        if tree as usize >= self.trees.len() {
            return Err(IndexError::UnknownTree(tree));
        }
        let file_id = self.files.len() as FileId;
        let mut content = ContentHandle::default();
        // The chunk-file record currently being extended for this file.
        let mut open_rec: Option<(u32, u32)> = None;
        if !bytes.is_empty() {
            let body = if bytes[bytes.len() - 1] == b'\n' {
                &bytes[..bytes.len() - 1]
            } else {
                bytes
            };
            for line in body.split(|&b| b == b'\n') {
                let hash = LineTable::hash_line(line);
                if let Some(entry) = self.lines.get(hash, line, &self.alloc) {
                    let rec =
                        &mut self.alloc.chunk_mut(entry.span.chunk).files[entry.rec as usize];
                    if !rec.files.contains(&file_id) {
                        rec.files.push(file_id);
                    }
                    content.push(entry.span);
                } else {
                    let span = self.alloc.append_line(line)?;
                    let rec = self.extend_or_open(&mut open_rec, span, file_id);
                    self.lines.insert(hash, LineEntry { span, rec });
                    content.push(span);
                }
            }
        }
        self.files.push(IndexedFile {
            tree,
            path: path.into(),
            no: file_id,
            content,
        });
        Ok(())
    }

    /// Grow the open record to cover a freshly written span, or open a new
    /// record when the span landed in a different chunk or after a gap.
    fn extend_or_open(&mut self, open: &mut Option<(u32, u32)>, span: Span, file: FileId) -> u32 {
        let end = span.off + span.len + 1; // the newline belongs to the range
        if let Some((ch, idx)) = *open {
            if ch == span.chunk {
                let rec = &mut self.alloc.chunk_mut(ch).files[idx as usize];
                if rec.right == span.off {
                    rec.right = end;
                    return idx;
                }
            }
        }
        let chunk = self.alloc.chunk_mut(span.chunk);
        chunk.files.push(ChunkFile {
            left: span.off,
            right: end,
            files: vec![file],
        });
        let idx = (chunk.files.len() - 1) as u32;
        *open = Some((span.chunk, idx));
        idx
    }

    /// Seal the index: build every chunk's suffix array and drop the dedup
    /// table. Idempotent; ingest calls after this fail.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        let start = Instant::now();
        let deduped = self.lines.len();
        self.alloc.finalize_all();
        self.lines.clear();
        self.finalized = true;
        debug!(
            files = self.files.len(),
            trees = self.trees.len(),
            chunks = self.alloc.chunks().len(),
            distinct_lines = deduped,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "index finalized"
        );
    }

    pub fn finalized(&self) -> bool {
        self.finalized
    }

    /// Serialize the finalized index to `path` (see the shard module for the
    /// layout). A half-written file is removed on error.
    pub fn dump(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        anyhow::ensure!(self.finalized, "dump before finalize");
        shard::write_index(self, path.as_ref())
    }

    /// Memory-map a dumped index. The result is finalized and read-only;
    /// chunk payloads and suffix arrays are read in place from the mapping.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<CodeIndex> {
        shard::read_index(path.as_ref())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn files(&self) -> &[IndexedFile] {
        &self.files
    }

    pub fn alloc(&self) -> &ChunkAllocator {
        &self.alloc
    }
}
