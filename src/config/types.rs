//! Deployment configuration schema.

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::modules::whitelist::{CacheConfig, GateConfig, WhitelistSeed};

/// Top-level deployment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Gate configuration.
    #[serde(default)]
    pub gate: GateConfig,

    /// Cache layer configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Whitelists seeded into the in-memory store. Deployments with an
    /// external store leave this empty.
    #[serde(default)]
    pub whitelists: Vec<WhitelistSeed>,
}

impl WardenConfig {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gate section.
    #[must_use]
    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// Set the cache section.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Add a seeded whitelist.
    #[must_use]
    pub fn with_whitelist(mut self, seed: WhitelistSeed) -> Self {
        self.whitelists.push(seed);
        self
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.gate
            .validate()
            .map_err(ConfigError::ValidationError)?;
        self.cache
            .validate()
            .map_err(ConfigError::ValidationError)?;

        for (i, seed) in self.whitelists.iter().enumerate() {
            seed.validate()
                .map_err(|e| ConfigError::ValidationError(format!("whitelists[{i}]: {e}")))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: WardenConfig = toml::from_str(
            r#"
            [gate]
            request_ip_headers = ["x-real-ip", "remote-addr"]
            actions = [{ action = "principal-id", lookup_field = "owner" }]
            credential_lookup = [{ keyword = "username", lookup_field = "owner" }]

            [cache]
            enabled = true
            ttl_secs = 120

            [[whitelists]]
            id = 1
            name = "Office"
            slug = "office"
            owner = 7
            ranges = ["203.0.113.0/24", "10.0.0.1"]
        "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.gate.request_ip_headers[0], "x-real-ip");
        assert_eq!(config.gate.actions.len(), 1);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.whitelists[0].ranges.len(), 2);
    }

    #[test]
    fn test_validation_rejects_bad_cidr_seed() {
        let config: WardenConfig = toml::from_str(
            r#"
            [gate]
            actions = [{ action = "principal-id", lookup_field = "owner" }]

            [[whitelists]]
            id = 1
            name = "Broken"
            slug = "broken"
            ranges = ["10.0.0.0/33"]
        "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("whitelists[0]"));
    }

    #[test]
    fn test_validation_rejects_empty_actions() {
        let config = WardenConfig::new();
        assert!(config.validate().is_err());
    }
}
