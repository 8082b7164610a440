//! Running throughput/latency/confidence counters compared against
//! configured SLOs (§4.10's performance check). Plain atomics, lock-free
//! on the hot path, narrowed to the three figures §4.10 names: completed/
//! failed task counts, cumulative latency, and cumulative confidence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Accumulating counters for one component's recent work.
pub struct RunningStats {
    started_at: Instant,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    cumulative_latency_us: AtomicU64,
    /// Confidence accumulated as fixed-point (confidence * 1000) so the
    /// counter stays a plain `AtomicU64`.
    cumulative_confidence_millis: AtomicU64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            cumulative_latency_us: AtomicU64::new(0),
            cumulative_confidence_millis: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self, latency: std::time::Duration, confidence: f64) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        self.cumulative_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.cumulative_confidence_millis
            .fetch_add((confidence.clamp(0.0, 1.0) * 1000.0) as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let completed = self.tasks_completed.load(Ordering::Relaxed);
        let failed = self.tasks_failed.load(Ordering::Relaxed);
        let elapsed_minutes = (self.started_at.elapsed().as_secs_f64() / 60.0).max(1.0 / 60.0);

        StatsSnapshot {
            tasks_completed: completed,
            tasks_failed: failed,
            throughput_per_min: completed as f64 / elapsed_minutes,
            avg_latency_ms: if completed == 0 {
                0.0
            } else {
                (self.cumulative_latency_us.load(Ordering::Relaxed) as f64 / completed as f64) / 1000.0
            },
            avg_confidence: if completed == 0 {
                1.0
            } else {
                (self.cumulative_confidence_millis.load(Ordering::Relaxed) as f64 / completed as f64) / 1000.0
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub throughput_per_min: f64,
    pub avg_latency_ms: f64,
    pub avg_confidence: f64,
}

/// Configured performance thresholds a [`StatsSnapshot`] is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSlo {
    pub max_avg_latency_ms: f64,
    pub min_avg_confidence: f64,
    pub min_throughput_per_min: f64,
}

impl Default for PerformanceSlo {
    fn default() -> Self {
        Self {
            max_avg_latency_ms: 5_000.0,
            min_avg_confidence: 0.5,
            min_throughput_per_min: 0.0,
        }
    }
}

impl PerformanceSlo {
    /// `true` if `snapshot` breaches any threshold; the performance check
    /// reports `Degraded` when this holds (§4.10).
    pub fn is_breached_by(&self, snapshot: &StatsSnapshot) -> bool {
        snapshot.tasks_completed > 0
            && (snapshot.avg_latency_ms > self.max_avg_latency_ms
                || snapshot.avg_confidence < self.min_avg_confidence
                || snapshot.throughput_per_min < self.min_throughput_per_min)
    }
}
