//! C10 Health & Metrics (§4.10): component health, throughput/latency/
//! confidence tracking, concurrency, and resource checks, behind a
//! 5-minute recompute cache.

pub mod metrics;
pub mod monitor;
pub mod probes;
pub mod status;

pub use metrics::{PerformanceSlo, RunningStats, StatsSnapshot};
pub use monitor::{ComponentHealthRecord, HealthMonitor, HealthReport, DEFAULT_CACHE_WINDOW};
pub use probes::{ComponentHealth, ExternalRuntimeProbe, HealthProbe, TempFilesystemProbe, WorkerAvailabilityProbe};
pub use status::Health;
