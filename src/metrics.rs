//! Metrics instrumentation for iterdns.
//!
//! All metrics are prefixed with `iterdns.`

use std::net::Ipv4Addr;
use std::time::Instant;

use hickory_proto::rr::RecordType;
use metrics::{counter, gauge, histogram};

/// Record a completed host resolution.
pub fn record_resolution(outcome: ResolutionOutcome, duration: std::time::Duration) {
    let outcome_str = match outcome {
        ResolutionOutcome::Answered => "answered",
        ResolutionOutcome::Empty => "empty",
        ResolutionOutcome::Error => "error",
    };

    counter!("iterdns.resolution.count", "outcome" => outcome_str).increment(1);
    histogram!("iterdns.resolution.duration.seconds", "outcome" => outcome_str)
        .record(duration.as_secs_f64());
}

/// Resolution outcome for metrics.
#[derive(Debug, Clone, Copy)]
pub enum ResolutionOutcome {
    /// At least one alias or address was returned.
    Answered,
    /// Resolution finished but produced no aliases or addresses.
    Empty,
    /// Resolution aborted on a transport failure.
    Error,
}

/// Record one UDP query/response exchange with an upstream server.
pub fn record_exchange(server: Ipv4Addr) {
    counter!("iterdns.exchange.count", "server" => server.to_string()).increment(1);
}

/// Record a cache lookup and its outcome.
pub fn record_cache_lookup(rtype: RecordType, result: CacheLookup) {
    let result_str = match result {
        CacheLookup::Hit => "hit",
        CacheLookup::Miss => "miss",
        CacheLookup::Expired => "expired",
    };

    counter!("iterdns.cache.lookup.count", "type" => rtype.to_string(), "result" => result_str)
        .increment(1);
}

/// Cache lookup outcome for metrics.
#[derive(Debug, Clone, Copy)]
pub enum CacheLookup {
    /// A still-valid entry matched.
    Hit,
    /// No entry matched.
    Miss,
    /// An entry matched but had expired and was removed.
    Expired,
}

/// Record the current number of cached entries.
pub fn record_cache_size(entries: usize) {
    gauge!("iterdns.cache.entries").set(entries as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
