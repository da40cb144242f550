use anyhow::{bail, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, Write};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use linegrep::{CancelToken, CodeIndex, ExitReason, MatchResult, MatchStats, Query};
use linegrep_cli::config::{build_index, load_config};

/// Interactive search server: line-delimited JSON frames on stdin/stdout.
/// Each input frame carries a query body; the server answers with zero or
/// more `match` frames followed by one `done` frame, or an `error` frame.
#[derive(Parser, Debug)]
#[command(name = "lg-search")]
struct Args {
    /// Load a dumped index (memory-mapped, read-only)
    #[arg(long)]
    index: Option<std::path::PathBuf>,
    /// Build an index in memory from a JSON config instead
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Per-query deadline in milliseconds; 0 disables
    #[arg(long, default_value_t = 0)]
    timeout_ms: u64,
}

#[derive(Deserialize)]
struct QueryFrame {
    body: QueryBody,
}

#[derive(Deserialize)]
struct QueryBody {
    line: Option<String>,
    file: Option<String>,
    repo: Option<String>,
    #[serde(default)]
    fold_case: bool,
    #[serde(default)]
    max_matches: u32,
}

/// One query's deadline thread. Disarming wakes it through the condvar and
/// joins, so a query that finishes early never leaves a sleeper behind.
struct Watchdog {
    done: Arc<(Mutex<bool>, Condvar)>,
    handle: std::thread::JoinHandle<()>,
}

impl Watchdog {
    fn arm(token: CancelToken, timeout: Duration) -> Self {
        let done = Arc::new((Mutex::new(false), Condvar::new()));
        let shared = done.clone();
        let handle = std::thread::spawn(move || {
            let (lock, cvar) = &*shared;
            let deadline = Instant::now() + timeout;
            let mut finished = lock.lock().unwrap();
            loop {
                if *finished {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    token.cancel_timeout();
                    return;
                }
                let (guard, _) = cvar.wait_timeout(finished, deadline - now).unwrap();
                finished = guard;
            }
        });
        Watchdog { done, handle }
    }

    fn disarm(self) {
        let (lock, cvar) = &*self.done;
        *lock.lock().unwrap() = true;
        cvar.notify_one();
        let _ = self.handle.join();
    }
}

fn write_frame(opcode: &str, body: serde_json::Value) {
    let frame = json!({ "opcode": opcode, "body": body });
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", frame).ok();
    out.flush().ok();
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn context_lines(lines: &[&[u8]]) -> Vec<String> {
    lines.iter().map(|l| lossy(l)).collect()
}

fn ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let idx = match (&args.index, &args.config) {
        (Some(path), _) => CodeIndex::load(path)?,
        (None, Some(cfg)) => build_index(&load_config(cfg)?)?,
        (None, None) => bail!("one of --index or --config is required"),
    };

    write_frame(
        "ready",
        json!({ "name": idx.name(), "trees": idx.trees() }),
    );

    for input in std::io::stdin().lock().lines() {
        let input = input?;
        if input.trim().is_empty() {
            continue;
        }
        let frame: QueryFrame = match serde_json::from_str(&input) {
            Ok(f) => f,
            Err(e) => {
                write_frame("error", json!(format!("parse error: {}", e)));
                continue;
            }
        };
        let Some(line) = frame.body.line else {
            write_frame("error", json!("no line pattern specified"));
            continue;
        };
        let q = Query {
            line,
            file: frame.body.file,
            tree: frame.body.repo,
            fold_case: frame.body.fold_case,
            max_matches: frame.body.max_matches,
        };

        let token = CancelToken::new();
        let watchdog = (args.timeout_ms > 0)
            .then(|| Watchdog::arm(token.clone(), Duration::from_millis(args.timeout_ms)));

        let mut stats = MatchStats::default();
        let mut on_match = |m: &MatchResult<'_>| {
            write_frame(
                "match",
                json!({
                    "tree": m.tree.name,
                    "version": m.tree.version,
                    "path": m.file.path,
                    "lno": m.line_number,
                    "context_before": context_lines(&m.context_before),
                    "context_after": context_lines(&m.context_after),
                    "bounds": [m.match_left, m.match_right],
                    "line": lossy(m.line),
                }),
            );
        };
        let outcome = idx.match_with_cancel(&q, &token, &mut on_match, &mut stats);
        if let Some(w) = watchdog {
            w.disarm();
        }
        match outcome {
            Ok(()) => {
                let mut body = json!({
                    "regex_time": ms(stats.regex_time),
                    "sort_time": ms(stats.sort_time),
                    "index_time": ms(stats.index_time),
                    "analyze_time": ms(stats.analyze_time),
                    "matches": stats.matches,
                });
                match stats.why {
                    ExitReason::None => {}
                    ExitReason::MatchLimit => body["why"] = json!("limit"),
                    ExitReason::Timeout => body["why"] = json!("timeout"),
                }
                write_frame("done", body);
            }
            Err(e) => write_frame("error", json!(e.to_string())),
        }
    }
    Ok(())
}
