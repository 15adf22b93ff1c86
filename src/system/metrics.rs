// src/system/metrics.rs
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("process {0} not found in the process table")]
    ProcessNotFound(u32),

    #[error("memory limit could not be determined")]
    NoLimit,

    #[error("process metrics are not available on {0}")]
    Unsupported(&'static str),
}

/// Memory figures for the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Resident set size.
    pub used_bytes: u64,
    /// The ceiling `used_bytes` is measured against.
    pub limit_bytes: u64,
    pub virtual_bytes: u64,
}

impl MemoryUsage {
    pub fn ratio(&self) -> f64 {
        if self.limit_bytes == 0 {
            return 1.0;
        }
        self.used_bytes as f64 / self.limit_bytes as f64
    }

    pub fn percent(&self) -> u64 {
        (self.ratio() * 100.0).round() as u64
    }

    pub fn used_mb(&self) -> u64 {
        (self.used_bytes as f64 / BYTES_PER_MB).round() as u64
    }

    pub fn limit_mb(&self) -> u64 {
        (self.limit_bytes as f64 / BYTES_PER_MB).round() as u64
    }

    pub fn virtual_mb(&self) -> u64 {
        (self.virtual_bytes as f64 / BYTES_PER_MB).round() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub uptime: Duration,
    pub memory: MemoryUsage,
}

/// Source of process state. Probes only ever see this trait, so they can be
/// driven by fixed snapshots in tests.
pub trait MetricsProvider: Send + Sync {
    fn snapshot(&self) -> Result<ProcessSnapshot, MetricsError>;

    /// Time since the service started. Unlike memory this can't fail.
    fn uptime(&self) -> Duration;
}

/// Reads the live process through `sysinfo`.
///
/// A fresh `System` is refreshed per snapshot, so concurrent probes share
/// nothing but the start instant.
#[derive(Debug)]
pub struct ProcessMetrics {
    started: Instant,
    limit_override: Option<u64>,
}

impl ProcessMetrics {
    pub fn new(limit_override: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            limit_override,
        }
    }

    fn memory(&self, pid: u32) -> Result<MemoryUsage, MetricsError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MetricsError::Unsupported(std::env::consts::OS));
        }

        let mut sys = System::new();
        sys.refresh_memory();
        let sys_pid = Pid::from_u32(pid);
        sys.refresh_process(sys_pid);
        let process = sys
            .process(sys_pid)
            .ok_or(MetricsError::ProcessNotFound(pid))?;

        let cgroup_limit = sys.cgroup_limits().map(|limits| limits.total_memory);
        let limit_bytes = select_limit(self.limit_override, cgroup_limit, sys.total_memory())?;

        Ok(MemoryUsage {
            used_bytes: process.memory(),
            limit_bytes,
            virtual_bytes: process.virtual_memory(),
        })
    }
}

impl MetricsProvider for ProcessMetrics {
    fn snapshot(&self) -> Result<ProcessSnapshot, MetricsError> {
        let pid = std::process::id();
        Ok(ProcessSnapshot {
            pid,
            uptime: self.uptime(),
            memory: self.memory(pid)?,
        })
    }

    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Configured limit, then the container's cgroup limit, then physical memory.
fn select_limit(
    configured: Option<u64>,
    cgroup: Option<u64>,
    total: u64,
) -> Result<u64, MetricsError> {
    [configured, cgroup, Some(total)]
        .into_iter()
        .flatten()
        .find(|limit| *limit > 0)
        .ok_or(MetricsError::NoLimit)
}
