//! The core Module Contract trait.
//!
//! A host environment manages the gating engine through this trait rather
//! than through any concrete type, so the same host code can drive any
//! component that implements it.

use super::{ModuleConfig, ModuleError, ModuleManifest, ModuleResult, ModuleStatus};
use std::collections::HashMap;

/// Metrics payload containing module-specific metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsPayload {
    /// Counter metrics (monotonically increasing).
    pub counters: HashMap<String, u64>,

    /// Gauge metrics (can go up and down).
    pub gauges: HashMap<String, f64>,
}

impl MetricsPayload {
    /// Creates a new empty metrics payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a counter metric.
    pub fn counter(&mut self, name: impl Into<String>, value: u64) {
        self.counters.insert(name.into(), value);
    }

    /// Adds a gauge metric.
    pub fn gauge(&mut self, name: impl Into<String>, value: f64) {
        self.gauges.insert(name.into(), value);
    }

    /// Formats metrics in Prometheus text format.
    #[must_use]
    pub fn to_prometheus(&self, prefix: &str) -> String {
        let mut output = String::new();

        for (name, value) in &self.counters {
            output.push_str(&format!("{prefix}_{name} {value}\n"));
        }

        for (name, value) in &self.gauges {
            output.push_str(&format!("{prefix}_{name} {value}\n"));
        }

        output
    }
}

/// The contract that host-managed modules must implement.
///
/// # Lifecycle
///
/// 1. `manifest()` - Called to discover module capabilities
/// 2. `init()` - Validate configuration and prepare internal state
/// 3. `start()` - Begin serving checks
/// 4. `status()` / `metrics()` - Ongoing monitoring
/// 5. `reload()` - Apply new configuration (optional)
/// 6. `stop()` - Graceful shutdown
pub trait ModuleContract: Send + Sync {
    /// Returns the module's manifest describing its identity and capabilities.
    fn manifest(&self) -> ModuleManifest;

    /// Initializes the module with the provided configuration.
    ///
    /// Configuration problems are fatal here: a module must refuse to
    /// initialize with an invalid configuration rather than degrade at
    /// request time.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::ConfigError` if the configuration is invalid.
    /// Returns `ModuleError::InitializationFailed` for other failures.
    fn init(&mut self, config: ModuleConfig) -> ModuleResult<()>;

    /// Starts the module.
    ///
    /// After this call returns successfully, the module is actively
    /// serving checks.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::StartFailed` if the module cannot start.
    /// Returns `ModuleError::InvalidState` if called before `init()`.
    fn start(&mut self) -> ModuleResult<()>;

    /// Stops the module gracefully, releasing its resources.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::StopFailed` if graceful shutdown fails.
    fn stop(&mut self) -> ModuleResult<()>;

    /// Reloads the module's configuration without a restart.
    ///
    /// The default implementation reports that hot reload is not
    /// supported.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::ConfigError` if the new configuration is invalid.
    fn reload(&mut self, _config: ModuleConfig) -> ModuleResult<()> {
        Err(ModuleError::ConfigError(
            "hot reload not supported".to_string(),
        ))
    }

    /// Returns the current status of the module.
    fn status(&self) -> ModuleStatus;

    /// Returns the current metrics from the module.
    fn metrics(&self) -> MetricsPayload;

    /// Called periodically for heartbeat/liveness checks.
    ///
    /// The default implementation returns `true` if the module is
    /// operational.
    fn heartbeat(&self) -> bool {
        self.status().is_operational()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_payload_prometheus_format() {
        let mut metrics = MetricsPayload::new();
        metrics.counter("checks_total", 7);
        metrics.gauge("uptime_secs", 1.5);

        let text = metrics.to_prometheus("ipwarden");
        assert!(text.contains("ipwarden_checks_total 7"));
        assert!(text.contains("ipwarden_uptime_secs 1.5"));
    }
}
