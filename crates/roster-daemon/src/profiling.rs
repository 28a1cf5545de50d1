use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use fastrace::collector::{Config, Reporter, SpanRecord};
use roster_types::{FunctionStats, ProfilingData};

/// Receives the spans of one profiled request as `(function, µs)` pairs.
#[derive(Clone, Default)]
pub struct RequestProfiler {
    finished: Arc<Mutex<Vec<(String, u64)>>>,
}

impl Reporter for RequestProfiler {
    fn report(&mut self, spans: Vec<SpanRecord>) {
        if let Ok(mut finished) = self.finished.lock() {
            finished.extend(
                spans
                    .iter()
                    .map(|span| (function_name(&span.name), span.duration_ns / 1_000)),
            );
        }
    }
}

impl RequestProfiler {
    /// Routes every span reported from now on into a fresh profiler.
    pub fn install() -> Self {
        let profiler = Self::default();
        fastrace::set_reporter(profiler.clone(), Config::default());
        profiler
    }

    /// Flushes pending spans and summarizes them. The span named after
    /// `method` is the request root and supplies the total.
    pub fn finish(&self, method: &str) -> ProfilingData {
        fastrace::flush();

        let finished = match self.finished.lock() {
            Ok(mut finished) => std::mem::take(&mut *finished),
            Err(_) => Vec::new(),
        };
        tracing::debug!("Profiled {} with {} spans", method, finished.len());

        summarize(method, finished)
    }
}

fn function_name(span_name: &str) -> String {
    span_name
        .rsplit("::")
        .find(|part| *part != "{{closure}}")
        .unwrap_or(span_name)
        .to_string()
}

fn summarize(method: &str, spans: Vec<(String, u64)>) -> ProfilingData {
    let mut total_us = 0;
    let mut by_function: BTreeMap<String, Vec<u64>> = BTreeMap::new();

    for (name, us) in spans {
        if name == method {
            total_us += us;
        } else {
            by_function.entry(name).or_default().push(us);
        }
    }

    let mut functions: Vec<FunctionStats> = by_function
        .into_iter()
        .map(|(name, durations)| function_stats(name, durations))
        .collect();
    functions.sort_by(|a, b| b.total_us.cmp(&a.total_us));

    ProfilingData {
        method: method.to_string(),
        total_us,
        functions,
    }
}

fn function_stats(name: String, mut durations: Vec<u64>) -> FunctionStats {
    durations.sort_unstable();
    let calls = durations.len();
    let total_us: u64 = durations.iter().sum();
    // nearest rank
    let p90_rank = (calls * 9).div_ceil(10).max(1);

    FunctionStats {
        name,
        calls: calls as u32,
        total_us,
        avg_us: total_us / calls.max(1) as u64,
        p90_us: durations.get(p90_rank - 1).copied().unwrap_or(0),
        max_us: durations.last().copied().unwrap_or(0),
    }
}
