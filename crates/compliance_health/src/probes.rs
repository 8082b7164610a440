//! Per-component probes (§4.10): "component probe + runtime resources
//! (memory-committed, worker-thread availability) + external dependencies
//! (temp-filesystem write/delete, presence of OCR runtime)". Each probe is
//! a small synchronous check — no I/O worth suspending on, per §5's
//! "outside of I/O the code is non-blocking" (a probe's own I/O is a few
//! bytes to a temp file, not a suspension point worth an async fn).

use crate::status::Health;

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentHealth {
    pub name: String,
    pub status: Health,
    pub detail: String,
}

/// A single health probe. Implementations must not panic; a probe that
/// cannot determine its own status should return [`Health::Unknown`]
/// rather than propagate an error.
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> ComponentHealth;
}

/// Writes and deletes a small file under the system temp directory,
/// standing in for "is the storage collaborator's backing filesystem
/// writable" (§4.10 external dependency check).
pub struct TempFilesystemProbe {
    name: String,
}

impl TempFilesystemProbe {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TempFilesystemProbe {
    fn default() -> Self {
        Self::new("temp_filesystem")
    }
}

impl HealthProbe for TempFilesystemProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> ComponentHealth {
        let path = std::env::temp_dir().join(format!(".compliance-health-probe-{}", uuid_like_suffix()));
        let result = std::fs::write(&path, b"probe").and_then(|_| std::fs::remove_file(&path));
        match result {
            Ok(()) => ComponentHealth {
                name: self.name.clone(),
                status: Health::Healthy,
                detail: "temp filesystem write/delete succeeded".to_string(),
            },
            Err(e) => ComponentHealth {
                name: self.name.clone(),
                status: Health::Unhealthy,
                detail: format!("temp filesystem probe failed: {e}"),
            },
        }
    }
}

fn uuid_like_suffix() -> u128 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    nanos + std::process::id() as u128
}

/// Compares `std::thread::available_parallelism()` against the pipeline's
/// configured `MaxConcurrency` (§6): the same call a worker pool would use
/// to size itself, read here as a health signal instead.
pub struct WorkerAvailabilityProbe {
    required_concurrency: u32,
}

impl WorkerAvailabilityProbe {
    pub fn new(required_concurrency: u32) -> Self {
        Self { required_concurrency }
    }
}

impl HealthProbe for WorkerAvailabilityProbe {
    fn name(&self) -> &str {
        "worker_availability"
    }

    fn check(&self) -> ComponentHealth {
        let available = std::thread::available_parallelism().map(|n| n.get() as u32);
        match available {
            Ok(n) if n >= self.required_concurrency => ComponentHealth {
                name: self.name().to_string(),
                status: Health::Healthy,
                detail: format!("{n} threads available, {} required", self.required_concurrency),
            },
            Ok(n) => ComponentHealth {
                name: self.name().to_string(),
                status: Health::Degraded,
                detail: format!("only {n} threads available, {} required", self.required_concurrency),
            },
            Err(e) => ComponentHealth {
                name: self.name().to_string(),
                status: Health::Unknown,
                detail: format!("could not query available parallelism: {e}"),
            },
        }
    }
}

/// Checks that an external runtime (e.g. an OCR engine binary) is
/// reachable on `PATH` by invoking it with `--version`. The OCR engine
/// itself is out of scope (§1); this probe only answers "is something
/// present to route PDF extraction to" (§4.10).
pub struct ExternalRuntimeProbe {
    component_name: String,
    binary: String,
}

impl ExternalRuntimeProbe {
    pub fn new(component_name: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            binary: binary.into(),
        }
    }
}

impl HealthProbe for ExternalRuntimeProbe {
    fn name(&self) -> &str {
        &self.component_name
    }

    fn check(&self) -> ComponentHealth {
        let status = std::process::Command::new(&self.binary).arg("--version").output();
        match status {
            Ok(output) if output.status.success() => ComponentHealth {
                name: self.component_name.clone(),
                status: Health::Healthy,
                detail: format!("{} responded to --version", self.binary),
            },
            Ok(output) => ComponentHealth {
                name: self.component_name.clone(),
                status: Health::Degraded,
                detail: format!("{} exited with {}", self.binary, output.status),
            },
            Err(e) => ComponentHealth {
                name: self.component_name.clone(),
                status: Health::Unhealthy,
                detail: format!("{} not reachable: {e}", self.binary),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_filesystem_probe_reports_healthy_on_a_writable_system() {
        let probe = TempFilesystemProbe::default();
        let result = probe.check();
        assert_eq!(result.status, Health::Healthy);
    }

    #[test]
    fn worker_availability_probe_degrades_when_under_required() {
        let probe = WorkerAvailabilityProbe::new(u32::MAX);
        let result = probe.check();
        assert_ne!(result.status, Health::Healthy);
    }

    #[test]
    fn external_runtime_probe_is_unhealthy_for_a_nonexistent_binary() {
        let probe = ExternalRuntimeProbe::new("ocr_engine", "definitely-not-a-real-binary-xyz");
        let result = probe.check();
        assert_eq!(result.status, Health::Unhealthy);
    }
}
