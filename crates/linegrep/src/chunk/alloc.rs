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

use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

use super::Chunk;
use crate::index::IndexError;
use crate::types::Span;

/// Default chunk capacity. Large enough to amortize per-chunk overhead,
/// small enough that finalize parallelizes across chunks on real corpora.
pub const DEFAULT_CHUNK_SIZE: u32 = 1 << 22;

/// Owner of all chunks. The heap back-end accepts writes until finalize; the
/// mapped back-end wraps a dumped index re-opened read-only, where finalize
/// is a no-op because the suffix arrays are already in the file.
#[derive(Debug)]
pub enum ChunkAllocator {
    Heap(HeapAllocator),
    Mapped(MappedAllocator),
}

#[derive(Debug)]
pub struct HeapAllocator {
    chunk_size: u32,
    chunks: Vec<Chunk>,
}

#[derive(Debug)]
pub struct MappedAllocator {
    chunk_size: u32,
    chunks: Vec<Chunk>,
}

impl ChunkAllocator {
    pub fn new_heap(chunk_size: u32) -> Self {
        assert!(chunk_size > 1, "chunk size too small");
        ChunkAllocator::Heap(HeapAllocator {
            chunk_size,
            chunks: Vec::new(),
        })
    }

    pub(crate) fn from_mapped(chunk_size: u32, chunks: Vec<Chunk>) -> Self {
        ChunkAllocator::Mapped(MappedAllocator { chunk_size, chunks })
    }

    pub fn chunk_size(&self) -> u32 {
        match self {
            ChunkAllocator::Heap(a) => a.chunk_size,
            ChunkAllocator::Mapped(a) => a.chunk_size,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        match self {
            ChunkAllocator::Heap(a) => &a.chunks,
            ChunkAllocator::Mapped(a) => &a.chunks,
        }
    }

    pub fn chunk(&self, id: u32) -> &Chunk {
        &self.chunks()[id as usize]
    }

    pub(crate) fn chunk_mut(&mut self, id: u32) -> &mut Chunk {
        match self {
            ChunkAllocator::Heap(a) => &mut a.chunks[id as usize],
            ChunkAllocator::Mapped(a) => &mut a.chunks[id as usize],
        }
    }

    /// Resolve a span to the line bytes it denotes (newline excluded).
    pub fn span_bytes(&self, span: Span) -> &[u8] {
        let data = self.chunk(span.chunk).bytes();
        &data[span.off as usize..(span.off + span.len) as usize]
    }

    /// Append one line (plus its newline) to the current chunk, rotating to
    /// a fresh chunk when it would not fit.
    pub(crate) fn append_line(&mut self, bytes: &[u8]) -> Result<Span, IndexError> {
        let a = match self {
            ChunkAllocator::Heap(a) => a,
            ChunkAllocator::Mapped(_) => return Err(IndexError::AlreadyFinalized),
        };
        let need = bytes.len() as u64 + 1;
        if need > a.chunk_size as u64 {
            return Err(IndexError::LineTooLong(bytes.len()));
        }
        let rotate = match a.chunks.last() {
            Some(c) => (c.free() as u64) < need,
            None => true,
        };
        if rotate {
            a.chunks.push(Chunk::new_heap(a.chunk_size));
        }
        let chunk = (a.chunks.len() - 1) as u32;
        let off = a.chunks.last_mut().unwrap().push_line(bytes);
        Ok(Span {
            chunk,
            off,
            len: bytes.len() as u32,
        })
    }

    /// Seal every chunk: build suffix arrays (chunk-parallel) and sort the
    /// chunk-file records. No-op for the mapped back-end.
    pub(crate) fn finalize_all(&mut self) {
        if let ChunkAllocator::Heap(a) = self {
            let start = Instant::now();
            a.chunks.par_iter_mut().for_each(|c| c.build_suffix());
            debug!(
                chunks = a.chunks.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "suffix arrays built"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_when_full() {
        let mut alloc = ChunkAllocator::new_heap(8);
        let a = alloc.append_line(b"abcd").unwrap(); // 5 bytes used
        let b = alloc.append_line(b"ef").unwrap(); // 3 more, chunk full
        let c = alloc.append_line(b"gh").unwrap(); // must rotate
        assert_eq!(a.chunk, 0);
        assert_eq!(b.chunk, 0);
        assert_eq!(c.chunk, 1);
        assert_eq!(alloc.span_bytes(c), b"gh");
    }

    #[test]
    fn oversized_line_is_rejected() {
        let mut alloc = ChunkAllocator::new_heap(4);
        let err = alloc.append_line(b"too long").unwrap_err();
        assert!(matches!(err, IndexError::LineTooLong(8)));
    }

    #[test]
    fn empty_line_takes_one_byte() {
        let mut alloc = ChunkAllocator::new_heap(16);
        let s = alloc.append_line(b"").unwrap();
        assert_eq!(s.len, 0);
        assert_eq!(alloc.chunk(0).size(), 1);
        assert_eq!(alloc.span_bytes(s), b"");
    }
}
