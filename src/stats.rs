use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Request outcome counters and provider latency, shared by all callers.
#[derive(Debug)]
pub struct CoreStats {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub duplicates_rejected: AtomicU64,
    pub validation_failures: AtomicU64,
    pub provider_successes: AtomicU64,
    pub provider_failures: AtomicU64,
    pub consec_provider_errors: AtomicU32,
    // EWMA of provider latency (microseconds)
    ewma_latency_us: AtomicU64,
    // Provider latency in milliseconds
    latency_ms: Mutex<Histogram<u64>>,
}

impl Default for CoreStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreStats {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            duplicates_rejected: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            provider_successes: AtomicU64::new(0),
            provider_failures: AtomicU64::new(0),
            consec_provider_errors: AtomicU32::new(0),
            ewma_latency_us: AtomicU64::new(0),
            latency_ms: Mutex::new(
                Histogram::new(3).expect("3 significant figures is a valid precision"),
            ),
        }
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_success(&self, latency: Duration) {
        self.provider_successes.fetch_add(1, Ordering::Relaxed);
        self.consec_provider_errors.store(0, Ordering::Relaxed);
        self.record_latency(latency);
    }

    pub fn record_provider_failure(&self, latency: Duration) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
        self.consec_provider_errors.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    fn record_latency(&self, latency: Duration) {
        self.latency_ms
            .lock()
            .saturating_record((latency.as_millis() as u64).max(1));

        // new_avg = (old_avg * 7 + sample) / 8, alpha = 1/8
        let latency_us = latency.as_micros() as u64;
        let mut old = self.ewma_latency_us.load(Ordering::Relaxed);
        loop {
            let new_val = if old == 0 {
                latency_us
            } else {
                (old * 7 + latency_us) / 8
            };
            match self.ewma_latency_us.compare_exchange_weak(
                old,
                new_val,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => old = x,
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let (p50, p99, samples) = {
            let hist = self.latency_ms.lock();
            (
                hist.value_at_quantile(0.50),
                hist.value_at_quantile(0.99),
                hist.len(),
            )
        };
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            duplicates_rejected: self.duplicates_rejected.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            provider_successes: self.provider_successes.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            consec_provider_errors: self.consec_provider_errors.load(Ordering::Relaxed),
            provider_latency_samples: samples,
            provider_latency_p50_ms: p50,
            provider_latency_p99_ms: p99,
            provider_latency_ewma_ms: self.ewma_latency_us.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub duplicates_rejected: u64,
    pub validation_failures: u64,
    pub provider_successes: u64,
    pub provider_failures: u64,
    pub consec_provider_errors: u32,
    pub provider_latency_samples: u64,
    pub provider_latency_p50_ms: u64,
    pub provider_latency_p99_ms: u64,
    pub provider_latency_ewma_ms: f64,
}
