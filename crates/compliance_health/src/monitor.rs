//! `HealthMonitor` ties the probes and the performance check together
//! behind the §4.10 cache window: "a full health report is recomputed at
//! most every 5 minutes on demand; `GetCurrentHealth()` returns cached
//! status unless stale." The cache is the one piece of shared mutable
//! state this crate owns (§5: "guard each with a single lock").

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{PerformanceSlo, RunningStats};
use crate::probes::{ComponentHealth, HealthProbe};
use crate::status::Health;

/// Default recompute window from §4.10.
pub const DEFAULT_CACHE_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall: Health,
    pub components: Vec<ComponentHealthRecord>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthRecord {
    pub name: String,
    pub status: Health,
    pub detail: String,
}

impl From<ComponentHealth> for ComponentHealthRecord {
    fn from(c: ComponentHealth) -> Self {
        Self {
            name: c.name,
            status: c.status,
            detail: c.detail,
        }
    }
}

struct CachedReport {
    report: HealthReport,
    computed_at: Instant,
}

pub struct HealthMonitor {
    probes: Vec<Arc<dyn HealthProbe>>,
    performance: Arc<RunningStats>,
    slo: PerformanceSlo,
    cache_window: Duration,
    cache: Mutex<Option<CachedReport>>,
}

impl HealthMonitor {
    pub fn new(probes: Vec<Arc<dyn HealthProbe>>, performance: Arc<RunningStats>, slo: PerformanceSlo) -> Self {
        Self {
            probes,
            performance,
            slo,
            cache_window: DEFAULT_CACHE_WINDOW,
            cache: Mutex::new(None),
        }
    }

    pub fn with_cache_window(mut self, window: Duration) -> Self {
        self.cache_window = window;
        self
    }

    /// Always recomputes, ignoring the cache.
    pub fn refresh(&self) -> HealthReport {
        let mut components: Vec<ComponentHealthRecord> =
            self.probes.iter().map(|p| p.check().into()).collect();

        let snapshot = self.performance.snapshot();
        let performance_health = if self.slo.is_breached_by(&snapshot) {
            Health::Degraded
        } else {
            Health::Healthy
        };
        components.push(ComponentHealthRecord {
            name: "performance".to_string(),
            status: performance_health,
            detail: format!(
                "throughput={:.2}/min avg_latency={:.1}ms avg_confidence={:.2}",
                snapshot.throughput_per_min, snapshot.avg_latency_ms, snapshot.avg_confidence
            ),
        });

        let overall = Health::overall(components.iter().map(|c| c.status));
        let report = HealthReport {
            overall,
            components,
            checked_at: Utc::now(),
        };

        let mut cache = self.cache.lock().unwrap();
        *cache = Some(CachedReport {
            report: report.clone(),
            computed_at: Instant::now(),
        });
        report
    }

    /// Returns the cached report if it is within `cache_window`;
    /// recomputes otherwise.
    pub fn current_health(&self) -> HealthReport {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.as_ref() {
                if cached.computed_at.elapsed() < self.cache_window {
                    return cached.report.clone();
                }
            }
        }
        self.refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::TempFilesystemProbe;

    #[test]
    fn current_health_reuses_cache_within_the_window() {
        let monitor = HealthMonitor::new(
            vec![Arc::new(TempFilesystemProbe::default())],
            Arc::new(RunningStats::new()),
            PerformanceSlo::default(),
        )
        .with_cache_window(Duration::from_secs(300));

        let first = monitor.current_health();
        let second = monitor.current_health();
        assert_eq!(first.checked_at, second.checked_at);
    }

    #[test]
    fn current_health_recomputes_once_stale() {
        let monitor = HealthMonitor::new(
            vec![Arc::new(TempFilesystemProbe::default())],
            Arc::new(RunningStats::new()),
            PerformanceSlo::default(),
        )
        .with_cache_window(Duration::from_millis(1));

        let first = monitor.current_health();
        std::thread::sleep(Duration::from_millis(5));
        let second = monitor.current_health();
        assert!(second.checked_at >= first.checked_at);
    }

    #[test]
    fn overall_reflects_worst_probe() {
        struct AlwaysUnhealthy;
        impl HealthProbe for AlwaysUnhealthy {
            fn name(&self) -> &str {
                "always_unhealthy"
            }
            fn check(&self) -> ComponentHealth {
                ComponentHealth {
                    name: self.name().to_string(),
                    status: Health::Unhealthy,
                    detail: "forced".to_string(),
                }
            }
        }

        let monitor = HealthMonitor::new(
            vec![Arc::new(TempFilesystemProbe::default()), Arc::new(AlwaysUnhealthy)],
            Arc::new(RunningStats::new()),
            PerformanceSlo::default(),
        );
        assert_eq!(monitor.refresh().overall, Health::Unhealthy);
    }
}
