use metrics::{counter, histogram};
use std::time::Instant;

// ── Metric names ────────────────────────────────────────────────────────

/// Total HTTP requests by endpoint and status
pub const REQUESTS_TOTAL: &str = "streamgate_requests_total";
/// Request duration in seconds
pub const REQUEST_DURATION: &str = "streamgate_request_duration_seconds";
/// Mode decisions (live, playback, reject)
pub const DECISIONS: &str = "streamgate_decisions_total";
/// Descriptors that failed validation, by kind (rtp, rtsp)
pub const INVALID_DESCRIPTORS: &str = "streamgate_invalid_descriptors_total";
/// Seek positions dropped because no playback source was usable
pub const IGNORED_SEEK: &str = "streamgate_ignored_seek_total";

// ── Recording helpers ───────────────────────────────────────────────────

/// Record an incoming request
pub fn record_request(endpoint: &str, status: u16) {
    counter!(REQUESTS_TOTAL, "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record request duration
pub fn record_duration(endpoint: &str, start: Instant) {
    let duration = start.elapsed().as_secs_f64();
    histogram!(REQUEST_DURATION, "endpoint" => endpoint.to_string()).record(duration);
}

/// Record the mode selector's outcome
pub fn record_decision(mode: &'static str) {
    counter!(DECISIONS, "mode" => mode).increment(1);
}

/// Record a descriptor that was treated as absent
pub fn record_invalid_descriptor(kind: &'static str) {
    counter!(INVALID_DESCRIPTORS, "kind" => kind).increment(1);
}

/// Record a dropped seek position
pub fn record_ignored_seek() {
    counter!(IGNORED_SEEK).increment(1);
}
