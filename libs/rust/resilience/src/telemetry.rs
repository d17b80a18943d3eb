//! Probe counters. Without an installed meter provider these are no-ops.
use once_cell::sync::Lazy;
use opentelemetry::{global, metrics::Counter, KeyValue};

static PROBE_ATTEMPTS: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("mlops-resilience")
        .u64_counter("mlops_probe_attempts_total")
        .with_description("Total probe attempts executed")
        .build()
});

static PROBE_FAILURES: Lazy<Counter<u64>> = Lazy::new(|| {
    global::meter("mlops-resilience")
        .u64_counter("mlops_probe_failures_total")
        .with_description("Health checks that exhausted every attempt")
        .build()
});

pub(crate) fn record_attempt(target: &str, success: bool) {
    PROBE_ATTEMPTS.add(1, &[KeyValue::new("target", target.to_string()), KeyValue::new("success", success)]);
}

pub(crate) fn record_exhausted(target: &str) {
    PROBE_FAILURES.add(1, &[KeyValue::new("target", target.to_string())]);
}
