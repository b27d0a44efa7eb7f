//! Per-source telemetry counters.
//!
//! One structured log line per tool call; counters are per-source atomics
//! with no cross-source locking, so hot paths never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::ErrorKind;
use crate::types::SourceId;

/// Rough token estimate used for usage accounting: UTF-8 length over four.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

#[derive(Default)]
struct SourceCounters {
    calls: AtomicU64,
    errors: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_duration_ms: AtomicU64,
}

/// Telemetry sink shared by the dispatcher and adapters.
#[derive(Clone)]
pub struct Telemetry {
    counters: Arc<HashMap<SourceId, SourceCounters>>,
}

impl Telemetry {
    /// Counter table covering every registered source.
    pub fn new() -> Self {
        let mut counters = HashMap::new();
        for source in SourceId::ALL {
            counters.insert(source, SourceCounters::default());
        }
        Self {
            counters: Arc::new(counters),
        }
    }

    /// Record one completed tool call and emit its structured log line.
    pub fn record_call(
        &self,
        source: SourceId,
        operation: &str,
        input_tokens: u64,
        output_tokens: u64,
        duration: Duration,
        error: Option<ErrorKind>,
    ) {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        if let Some(c) = self.counters.get(&source) {
            c.calls.fetch_add(1, Ordering::Relaxed);
            c.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
            c.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
            c.total_duration_ms.fetch_add(duration_ms, Ordering::Relaxed);
            if error.is_some() {
                c.errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        match error {
            None => tracing::info!(
                target: "yargi::telemetry",
                %source,
                operation,
                input_tokens,
                output_tokens,
                duration_ms,
                outcome = "ok",
                "tool call"
            ),
            Some(kind) => tracing::info!(
                target: "yargi::telemetry",
                %source,
                operation,
                input_tokens,
                output_tokens,
                duration_ms,
                outcome = "error",
                error_kind = ?kind,
                "tool call"
            ),
        }
    }

    /// Snapshot of one source's counters:
    /// `(calls, errors, input_tokens, output_tokens, total_duration_ms)`.
    pub fn snapshot(&self, source: SourceId) -> (u64, u64, u64, u64, u64) {
        self.counters.get(&source).map_or((0, 0, 0, 0, 0), |c| {
            (
                c.calls.load(Ordering::Relaxed),
                c.errors.load(Ordering::Relaxed),
                c.input_tokens.load(Ordering::Relaxed),
                c.output_tokens.load(Ordering::Relaxed),
                c.total_duration_ms.load(Ordering::Relaxed),
            )
        })
    }

    /// Final flush on shutdown; logs one summary line per active source.
    /// Idempotent — repeated calls re-log the same totals.
    pub fn flush(&self) {
        for source in SourceId::ALL {
            let (calls, errors, input, output, duration_ms) = self.snapshot(source);
            if calls > 0 {
                tracing::info!(
                    target: "yargi::telemetry",
                    %source,
                    calls,
                    errors,
                    input_tokens = input,
                    output_tokens = output,
                    total_duration_ms = duration_ms,
                    "source totals"
                );
            }
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
