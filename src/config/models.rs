// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub probes: ProbesConfig,
    pub app: AppConfig,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid memory thresholds: {0}")]
    MemoryThresholds(String),

    #[error("invalid latency thresholds: warn_ms ({warn_ms}) must be below fail_ms ({fail_ms})")]
    LatencyThresholds { warn_ms: u64, fail_ms: u64 },

    #[error("memory.limit_mb must be greater than zero")]
    ZeroMemoryLimit,

    #[error("memory.limit_mb ({0}) does not fit in a byte count")]
    MemoryLimitOverflow(u64),

    #[error("metrics path must start with '/': {0}")]
    MetricsPath(String),

    #[error("metrics port {0} collides with the probe server port")]
    PortCollision(u16),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.probes.memory.validate()?;
        self.probes.latency.validate()?;

        if !self.metrics.path.starts_with('/') {
            return Err(ConfigError::MetricsPath(self.metrics.path.clone()));
        }
        if self.metrics.enabled && self.metrics.port == self.server.port {
            return Err(ConfigError::PortCollision(self.metrics.port));
        }
        Ok(())
    }

    /// Apply the environment variables a hosting platform sets on the
    /// container (`PORT`, `HOST`, `APP_ENV`, `APP_VERSION`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = lookup("HOST").and_then(|h| h.parse().ok()) {
            self.server.host = host;
        }
        if let Some(env) = lookup("APP_ENV") {
            self.app.environment = env;
        }
        if let Some(version) = lookup("APP_VERSION") {
            self.app.version = version;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    pub memory: MemoryThresholds,
    pub latency: LatencyThresholds,
}

/// Memory thresholds as `used / limit` ratios.
///
/// `warn_ratio` and `fail_ratio` grade the detailed report. `critical_ratio`
/// is the cutoff at which HEAD probes and readiness stop accepting traffic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryThresholds {
    pub warn_ratio: f64,
    pub fail_ratio: f64,
    pub critical_ratio: f64,
    /// Overrides the detected memory limit.
    pub limit_mb: Option<u64>,
}

impl MemoryThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0.0 < self.warn_ratio
            && self.warn_ratio <= self.fail_ratio
            && self.fail_ratio <= self.critical_ratio
            && self.critical_ratio <= 1.0;
        if !ordered {
            return Err(ConfigError::MemoryThresholds(format!(
                "expected 0 < warn ({}) <= fail ({}) <= critical ({}) <= 1",
                self.warn_ratio, self.fail_ratio, self.critical_ratio
            )));
        }
        match self.limit_mb {
            Some(0) => return Err(ConfigError::ZeroMemoryLimit),
            Some(mb) if mb_to_bytes(mb).is_none() => {
                return Err(ConfigError::MemoryLimitOverflow(mb))
            }
            _ => {}
        }
        Ok(())
    }

    /// `None` when unset, or when the limit overflows (rejected by `validate`).
    pub fn limit_bytes(&self) -> Option<u64> {
        self.limit_mb.and_then(mb_to_bytes)
    }
}

impl Default for MemoryThresholds {
    fn default() -> Self {
        Self {
            warn_ratio: 0.70,
            fail_ratio: 0.90,
            critical_ratio: 0.95,
            limit_mb: None,
        }
    }
}

fn mb_to_bytes(mb: u64) -> Option<u64> {
    mb.checked_mul(1024 * 1024)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyThresholds {
    pub warn_ms: u64,
    pub fail_ms: u64,
}

impl LatencyThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.warn_ms >= self.fail_ms {
            return Err(ConfigError::LatencyThresholds {
                warn_ms: self.warn_ms,
                fail_ms: self.fail_ms,
            });
        }
        Ok(())
    }

    pub fn warn(&self) -> Duration {
        Duration::from_millis(self.warn_ms)
    }

    pub fn fail(&self) -> Duration {
        Duration::from_millis(self.fail_ms)
    }
}

impl Default for LatencyThresholds {
    fn default() -> Self {
        Self {
            warn_ms: 500,
            fail_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: String,
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}
