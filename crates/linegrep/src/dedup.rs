//! Build-phase table canonicalizing identical lines to their first-occurrence
//! span. Single-writer; dropped at finalize.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;

use crate::chunk::ChunkAllocator;
use crate::types::Span;

/// A dedup hit: the canonical span plus the index of the chunk-file record
/// that covers it, so ingest can extend that record with the new file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineEntry {
    pub span: Span,
    pub rec: u32,
}

#[derive(Default, Debug)]
pub(crate) struct LineTable {
    map: HashMap<u64, Vec<LineEntry>>,
}

impl LineTable {
    pub fn hash_line(bytes: &[u8]) -> u64 {
        let mut h = DefaultHasher::new();
        h.write(bytes);
        h.finish()
    }

    /// Look up `bytes` under its precomputed hash, comparing chunk bytes on
    /// bucket collisions.
    pub fn get(&self, hash: u64, bytes: &[u8], alloc: &ChunkAllocator) -> Option<LineEntry> {
        let bucket = self.map.get(&hash)?;
        bucket
            .iter()
            .find(|e| alloc.span_bytes(e.span) == bytes)
            .copied()
    }

    pub fn insert(&mut self, hash: u64, entry: LineEntry) {
        self.map.entry(hash).or_default().push(entry);
    }

    pub fn len(&self) -> usize {
        self.map.values().map(|v| v.len()).sum()
    }

    pub fn clear(&mut self) {
        self.map = HashMap::new();
    }
}
