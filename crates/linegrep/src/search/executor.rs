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

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::scanner::Scanner;
use crate::index::CodeIndex;
use crate::query::{QueryError, QueryPlan};
use crate::types::{ExitReason, MatchResult, MatchStats, Query};

pub(crate) const EXIT_NONE: u8 = 0;
pub(crate) const EXIT_TIMEOUT: u8 = 1;
pub(crate) const EXIT_MATCH_LIMIT: u8 = 2;

/// External handle onto a query's exit-reason cell. Cancelling is
/// cooperative: workers notice between candidate lines, drain what they
/// hold, and stop taking new chunks.
#[derive(Clone, Default)]
pub struct CancelToken {
    cell: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the query into the `timeout` exit reason. A no-op if the query
    /// already stopped for another reason.
    pub fn cancel_timeout(&self) {
        let _ = self.cell.compare_exchange(
            EXIT_NONE,
            EXIT_TIMEOUT,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub(crate) fn cell(&self) -> Arc<AtomicU8> {
        self.cell.clone()
    }
}

/// Shared state of one in-flight query.
pub(crate) struct Job {
    pub max_matches: u32,
    pub exit: Arc<AtomicU8>,
    pub matches: AtomicU32,
    pub next_chunk: AtomicUsize,
    pub regex_nanos: AtomicU64,
    pub sort_nanos: AtomicU64,
    pub index_nanos: AtomicU64,
}

impl Job {
    pub fn should_stop(&self) -> bool {
        self.exit.load(Ordering::Relaxed) != EXIT_NONE
    }

    /// Reserve a result slot under the match cap. On overflow the counter is
    /// rolled back so `matches` always equals the number delivered, and the
    /// exit reason records that the corpus had more.
    pub fn take_slot(&self) -> bool {
        let prev = self.matches.fetch_add(1, Ordering::SeqCst);
        if self.max_matches > 0 && prev >= self.max_matches {
            self.matches.fetch_sub(1, Ordering::SeqCst);
            let _ = self.exit.compare_exchange(
                EXIT_NONE,
                EXIT_MATCH_LIMIT,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            return false;
        }
        true
    }
}

pub(crate) type Sink<'a> = Mutex<&'a mut (dyn for<'m> FnMut(&MatchResult<'m>) + Send)>;

impl CodeIndex {
    /// Run `q`, invoking `on_match` once per match, then fill `stats`.
    /// Results arrive in no particular cross-chunk order. Cancellation via
    /// the cap is handled internally; see `match_with_cancel` for deadlines.
    pub fn match_query(
        &self,
        q: &Query,
        on_match: &mut (dyn FnMut(&MatchResult<'_>) + Send),
        stats: &mut MatchStats,
    ) -> Result<(), QueryError> {
        self.match_with_cancel(q, &CancelToken::new(), on_match, stats)
    }

    /// As `match_query`, with an externally cancellable exit-reason cell.
    pub fn match_with_cancel(
        &self,
        q: &Query,
        token: &CancelToken,
        on_match: &mut (dyn FnMut(&MatchResult<'_>) + Send),
        stats: &mut MatchStats,
    ) -> Result<(), QueryError> {
        let analyze_start = Instant::now();
        let plan = QueryPlan::compile(q)?;
        stats.analyze_time = analyze_start.elapsed();

        let job = Job {
            max_matches: plan.max_matches,
            exit: token.cell(),
            matches: AtomicU32::new(0),
            next_chunk: AtomicUsize::new(0),
            regex_nanos: AtomicU64::new(0),
            sort_nanos: AtomicU64::new(0),
            index_nanos: AtomicU64::new(0),
        };
        let chunks = self.alloc().chunks().len();
        let workers = rayon::current_num_threads().min(chunks).max(1);
        let sink: Sink<'_> = Mutex::new(on_match);

        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    let mut scanner = Scanner::new(self, &plan, &job, &sink);
                    loop {
                        if job.should_stop() {
                            break;
                        }
                        let i = job.next_chunk.fetch_add(1, Ordering::Relaxed);
                        if i >= chunks {
                            break;
                        }
                        scanner.scan_chunk(i as u32);
                    }
                    scanner.flush_times();
                });
            }
        });

        stats.matches = job.matches.load(Ordering::SeqCst);
        stats.regex_time = Duration::from_nanos(job.regex_nanos.load(Ordering::Relaxed));
        stats.sort_time = Duration::from_nanos(job.sort_nanos.load(Ordering::Relaxed));
        stats.index_time = Duration::from_nanos(job.index_nanos.load(Ordering::Relaxed));
        stats.why = match job.exit.load(Ordering::SeqCst) {
            EXIT_TIMEOUT => ExitReason::Timeout,
            EXIT_MATCH_LIMIT => ExitReason::MatchLimit,
            _ => ExitReason::None,
        };
        Ok(())
    }
}
