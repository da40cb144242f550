//! Per-file content handles: an ordered list of line spans that reproduces
//! the file byte-for-byte when each span is followed by a newline.

use crate::chunk::ChunkAllocator;
use crate::types::Span;

#[derive(Debug, Clone, Default)]
pub struct ContentHandle {
    spans: Vec<Span>,
}

impl ContentHandle {
    pub(crate) fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub(crate) fn from_spans(spans: Vec<Span>) -> Self {
        ContentHandle { spans }
    }

    /// One span per line, in file order.
    pub fn lines(&self) -> &[Span] {
        &self.spans
    }

    pub fn line_count(&self) -> usize {
        self.spans.len()
    }

    /// Bytes of the 0-based line `idx`, newline excluded.
    pub fn line_bytes<'a>(&self, idx: usize, alloc: &'a ChunkAllocator) -> &'a [u8] {
        alloc.span_bytes(self.spans[idx])
    }

    /// 0-based indices of every line that is exactly `span`. A deduplicated
    /// line appears once per occurrence in the file.
    pub(crate) fn lines_matching<'a>(&'a self, span: Span) -> impl Iterator<Item = usize> + 'a {
        self.spans
            .iter()
            .enumerate()
            .filter(move |(_, s)| **s == span)
            .map(|(i, _)| i)
    }

    /// Reconstruct the file. Every line, including the last, is followed by
    /// a newline; whether the source ended with one is not recorded.
    pub fn reconstruct(&self, alloc: &ChunkAllocator) -> Vec<u8> {
        let mut out = Vec::new();
        for &s in &self.spans {
            out.extend_from_slice(alloc.span_bytes(s));
            out.push(b'\n');
        }
        out
    }
}
