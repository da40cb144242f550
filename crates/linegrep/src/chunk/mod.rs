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

//! Chunk store: large packed buffers of line bytes, each carrying a suffix
//! array (post-finalize) and the interval records mapping byte ranges back to
//! the files that own them.

use memmap2::Mmap;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::types::FileId;

mod alloc;
pub use self::alloc::{ChunkAllocator, HeapAllocator, MappedAllocator, DEFAULT_CHUNK_SIZE};

pub(crate) mod suffix;

/// Byte range `[left, right)` of a chunk that is part of every file in
/// `files`. Ranges are sorted by `left` and may overlap when line
/// deduplication caused sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFile {
    pub left: u32,
    pub right: u32,
    pub files: Vec<FileId>,
}

#[derive(Debug)]
enum ChunkData {
    Heap(Vec<u8>),
    Mapped { map: Arc<Mmap>, off: usize, len: usize },
}

#[derive(Debug)]
enum SuffixTable {
    Unbuilt,
    Heap(Vec<u32>),
    Mapped { map: Arc<Mmap>, off: usize, n: usize },
}

/// A contiguous buffer of `\n`-separated line bytes. Writable until the
/// allocator seals it; immutable and freely shared after finalize.
#[derive(Debug)]
pub struct Chunk {
    data: ChunkData,
    size: u32,
    capacity: u32,
    suffix: SuffixTable,
    pub(crate) files: Vec<ChunkFile>,
}

impl Chunk {
    fn new_heap(capacity: u32) -> Self {
        Chunk {
            data: ChunkData::Heap(Vec::with_capacity(capacity as usize)),
            size: 0,
            capacity,
            suffix: SuffixTable::Unbuilt,
            files: Vec::new(),
        }
    }

    pub(crate) fn from_mapping(
        map: Arc<Mmap>,
        data_off: usize,
        size: u32,
        sa_off: usize,
        files: Vec<ChunkFile>,
    ) -> Self {
        Chunk {
            data: ChunkData::Mapped {
                map: map.clone(),
                off: data_off,
                len: size as usize,
            },
            size,
            capacity: size,
            suffix: SuffixTable::Mapped {
                map,
                off: sa_off,
                n: size as usize,
            },
            files,
        }
    }

    /// Bytes in use, `[0, size)`.
    pub fn bytes(&self) -> &[u8] {
        match &self.data {
            ChunkData::Heap(v) => &v[..],
            ChunkData::Mapped { map, off, len } => &map[*off..*off + *len],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn free(&self) -> u32 {
        self.capacity - self.size
    }

    /// Append `bytes` plus a newline. Caller checks capacity first.
    fn push_line(&mut self, bytes: &[u8]) -> u32 {
        let off = self.size;
        match &mut self.data {
            ChunkData::Heap(v) => {
                v.extend_from_slice(bytes);
                v.push(b'\n');
            }
            ChunkData::Mapped { .. } => unreachable!("write to mapped chunk"),
        }
        self.size += bytes.len() as u32 + 1;
        off
    }

    pub(crate) fn build_suffix(&mut self) {
        if matches!(self.suffix, SuffixTable::Unbuilt) {
            self.suffix = SuffixTable::Heap(suffix::build_suffix_array(self.bytes()));
        }
        self.files.sort_by_key(|f| f.left);
    }

    pub fn suffix_len(&self) -> usize {
        match &self.suffix {
            SuffixTable::Unbuilt => 0,
            SuffixTable::Heap(v) => v.len(),
            SuffixTable::Mapped { n, .. } => *n,
        }
    }

    pub fn suffix_at(&self, i: usize) -> u32 {
        match &self.suffix {
            SuffixTable::Unbuilt => unreachable!("suffix array not built"),
            SuffixTable::Heap(v) => v[i],
            SuffixTable::Mapped { map, off, .. } => {
                let p = off + 4 * i;
                u32::from_le_bytes(map[p..p + 4].try_into().unwrap())
            }
        }
    }

    /// Binary-search the suffix array for the range of suffixes that begin
    /// with `needle`. Returns `(lo, hi)` over suffix-array positions.
    pub fn probe(&self, needle: &[u8]) -> (usize, usize) {
        let n = self.suffix_len();
        let data = self.bytes();
        let cmp = |i: usize| prefix_cmp(&data[self.suffix_at(i) as usize..], needle);
        let lo = partition(n, |i| cmp(i) == Ordering::Less);
        let hi = partition(n, |i| cmp(i) != Ordering::Greater);
        (lo, hi)
    }

    pub fn files(&self) -> &[ChunkFile] {
        &self.files
    }

    /// Collect the ids of every file whose recorded range intersects
    /// `[left, right)`. Records are sorted by `left`, so the walk stops at
    /// the first record starting past `right`; duplicates from overlapping
    /// records are removed.
    pub(crate) fn owners_of(&self, left: u32, right: u32, out: &mut Vec<FileId>) {
        out.clear();
        for rec in &self.files {
            if rec.left >= right {
                break;
            }
            if rec.right > left {
                out.extend_from_slice(&rec.files);
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

/// Compare a suffix against a probe, looking only at the probe's length:
/// `Equal` means the suffix starts with the probe.
fn prefix_cmp(suffix: &[u8], probe: &[u8]) -> Ordering {
    let n = suffix.len().min(probe.len());
    match suffix[..n].cmp(&probe[..n]) {
        Ordering::Equal if suffix.len() < probe.len() => Ordering::Less,
        ord => ord,
    }
}

fn partition(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0usize, n);
    while lo < hi {
        let mid = (lo + hi) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}
