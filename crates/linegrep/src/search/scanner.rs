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

//! Per-worker chunk scanning: suffix-array probes locate candidate offsets,
//! each candidate expands to its line, owning files come from the chunk-file
//! interval records, and the line regex confirms the match. For a given
//! `(file, line)` at most one match is emitted, the leftmost.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use super::executor::{Job, Sink};
use super::CONTEXT_LINES;
use crate::chunk::Chunk;
use crate::index::CodeIndex;
use crate::query::QueryPlan;
use crate::regex_analyze::Probes;
use crate::types::{FileId, IndexedFile, MatchResult, Span};

pub(crate) struct Scanner<'a, 'b> {
    index: &'a CodeIndex,
    plan: &'a QueryPlan,
    job: &'a Job,
    sink: &'a Sink<'b>,
    /// Combined tree/file filter verdict, cached per file for the query.
    file_ok: HashMap<FileId, bool>,
    owners: Vec<FileId>,
    seen_lines: HashSet<u32>,
    regex_time: Duration,
    sort_time: Duration,
    index_time: Duration,
}

impl<'a, 'b> Scanner<'a, 'b> {
    pub fn new(
        index: &'a CodeIndex,
        plan: &'a QueryPlan,
        job: &'a Job,
        sink: &'a Sink<'b>,
    ) -> Self {
        Scanner {
            index,
            plan,
            job,
            sink,
            file_ok: HashMap::new(),
            owners: Vec::new(),
            seen_lines: HashSet::new(),
            regex_time: Duration::ZERO,
            sort_time: Duration::ZERO,
            index_time: Duration::ZERO,
        }
    }

    pub fn scan_chunk(&mut self, chunk_id: u32) {
        let chunk = self.index.alloc().chunk(chunk_id);
        if chunk.size() == 0 {
            return;
        }
        let plan = self.plan;
        match plan.probes() {
            Probes::Literals(probes) => self.scan_probes(chunk_id, chunk, probes),
            Probes::FullScan => self.scan_full(chunk_id, chunk),
        }
    }

    fn scan_probes(&mut self, chunk_id: u32, chunk: &'a Chunk, probes: &[Vec<u8>]) {
        let t = Instant::now();
        let mut cands: Vec<u32> = Vec::new();
        for p in probes {
            let (lo, hi) = chunk.probe(p);
            cands.extend((lo..hi).map(|i| chunk.suffix_at(i)));
        }
        self.index_time += t.elapsed();

        let t = Instant::now();
        cands.sort_unstable();
        cands.dedup();
        self.sort_time += t.elapsed();

        let data = chunk.bytes();
        self.seen_lines.clear();
        for off in cands {
            if self.job.should_stop() {
                return;
            }
            let off = off as usize;
            let ls = memchr::memrchr(b'\n', &data[..off]).map_or(0, |p| p + 1);
            if !self.seen_lines.insert(ls as u32) {
                continue; // several probes landed on this line
            }
            let le = off + memchr::memchr(b'\n', &data[off..]).unwrap_or(data.len() - off);
            if self.match_line(chunk_id, chunk, ls, le).is_break() {
                return;
            }
        }
    }

    fn scan_full(&mut self, chunk_id: u32, chunk: &'a Chunk) {
        let data = chunk.bytes();
        let mut ls = 0usize;
        while ls < data.len() {
            if self.job.should_stop() {
                return;
            }
            let le = ls + memchr::memchr(b'\n', &data[ls..]).unwrap_or(data.len() - ls);
            if self.match_line(chunk_id, chunk, ls, le).is_break() {
                return;
            }
            ls = le + 1;
        }
    }

    /// Confirm the regex on `data[ls..le)` and emit one result per owning
    /// file and occurrence, honoring filters and the match cap.
    fn match_line(&mut self, chunk_id: u32, chunk: &'a Chunk, ls: usize, le: usize) -> ControlFlow<()> {
        let plan = self.plan;
        let index = self.index;
        let data = chunk.bytes();
        let line = &data[ls..le];

        let t = Instant::now();
        let found = plan.line.find(line);
        self.regex_time += t.elapsed();
        let Some(m) = found else {
            return ControlFlow::Continue(());
        };

        let mut owners = std::mem::take(&mut self.owners);
        // The line's newline byte is part of its recorded range; including it
        // keeps zero-length lines from producing an empty interval query.
        chunk.owners_of(ls as u32, le as u32 + 1, &mut owners);
        let span = Span {
            chunk: chunk_id,
            off: ls as u32,
            len: (le - ls) as u32,
        };
        let mut flow = ControlFlow::Continue(());
        'owners: for &fid in &owners {
            if !self.file_allowed(fid) {
                continue;
            }
            let file = &index.files()[fid as usize];
            // A record can over-cover after dedup extensions; the span walk
            // is what decides whether this file really has the line.
            for line_idx in file.content.lines_matching(span) {
                if self.job.should_stop() {
                    flow = ControlFlow::Break(());
                    break 'owners;
                }
                let (context_before, context_after) = self.context(file, line_idx);
                let result = MatchResult {
                    tree: &index.trees()[file.tree as usize],
                    file,
                    line_number: (line_idx + 1) as u32,
                    line,
                    match_left: m.start() as u32,
                    match_right: m.end() as u32,
                    context_before,
                    context_after,
                };
                if !self.emit(&result) {
                    flow = ControlFlow::Break(());
                    break 'owners;
                }
            }
        }
        self.owners = owners;
        flow
    }

    fn file_allowed(&mut self, fid: FileId) -> bool {
        if let Some(&ok) = self.file_ok.get(&fid) {
            return ok;
        }
        let file = &self.index.files()[fid as usize];
        let tree = &self.index.trees()[file.tree as usize];
        let ok = self
            .plan
            .tree
            .as_ref()
            .map_or(true, |re| re.is_match(tree.name.as_bytes()))
            && self
                .plan
                .file
                .as_ref()
                .map_or(true, |re| re.is_match(file.path.as_bytes()));
        self.file_ok.insert(fid, ok);
        ok
    }

    fn context(&self, file: &'a IndexedFile, idx: usize) -> (Vec<&'a [u8]>, Vec<&'a [u8]>) {
        let alloc = self.index.alloc();
        let lo = idx.saturating_sub(CONTEXT_LINES);
        let before = (lo..idx)
            .map(|i| file.content.line_bytes(i, alloc))
            .collect();
        let hi = (idx + 1 + CONTEXT_LINES).min(file.content.line_count());
        let after = (idx + 1..hi)
            .map(|i| file.content.line_bytes(i, alloc))
            .collect();
        (before, after)
    }

    fn emit(&self, m: &MatchResult<'_>) -> bool {
        if !self.job.take_slot() {
            return false;
        }
        let mut sink = self.sink.lock();
        (*sink)(m);
        true
    }

    /// Fold this worker's phase timings into the job totals.
    pub fn flush_times(&self) {
        self.job
            .regex_nanos
            .fetch_add(self.regex_time.as_nanos() as u64, Ordering::Relaxed);
        self.job
            .sort_nanos
            .fetch_add(self.sort_time.as_nanos() as u64, Ordering::Relaxed);
        self.job
            .index_nanos
            .fetch_add(self.index_time.as_nanos() as u64, Ordering::Relaxed);
    }
}
