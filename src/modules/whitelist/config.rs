//! Configuration for the whitelist gating module.

use serde::{Deserialize, Serialize};

use super::matcher;

/// Main configuration for the whitelist gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Whether gating is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Metadata keys to try when resolving the client IP, in order.
    #[serde(default = "default_ip_headers")]
    pub request_ip_headers: Vec<String>,

    /// Ordered credential actions; the first action that resolves a
    /// non-empty whitelist set decides.
    #[serde(default)]
    pub actions: Vec<ActionBinding>,

    /// Credential keyword to lookup-field mapping for backend screening.
    #[serde(default)]
    pub credential_lookup: Vec<CredentialBinding>,

    /// Superusers bypass evaluation entirely.
    #[serde(default = "default_enabled")]
    pub exempt_superusers: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_ip_headers() -> Vec<String> {
    vec!["x-forwarded-for".to_string(), "remote-addr".to_string()]
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_ip_headers: default_ip_headers(),
            actions: Vec::new(),
            credential_lookup: Vec::new(),
            exempt_superusers: true,
        }
    }
}

impl GateConfig {
    /// Create a new gate config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IP header priority list.
    #[must_use]
    pub fn with_ip_headers(mut self, headers: Vec<String>) -> Self {
        self.request_ip_headers = headers;
        self
    }

    /// Append an action binding.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>, lookup_field: impl Into<String>) -> Self {
        self.actions.push(ActionBinding {
            action: action.into(),
            lookup_field: lookup_field.into(),
        });
        self
    }

    /// Append a credential binding.
    #[must_use]
    pub fn with_credential(
        mut self,
        keyword: impl Into<String>,
        lookup_field: impl Into<String>,
    ) -> Self {
        self.credential_lookup.push(CredentialBinding {
            keyword: keyword.into(),
            lookup_field: lookup_field.into(),
        });
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.actions.is_empty() {
            return Err("gate.actions cannot be empty while the gate is enabled".to_string());
        }

        if self.request_ip_headers.is_empty() {
            return Err("gate.request_ip_headers cannot be empty".to_string());
        }

        for (i, binding) in self.actions.iter().enumerate() {
            binding
                .validate()
                .map_err(|e| format!("gate.actions[{i}]: {e}"))?;
        }

        for (i, binding) in self.credential_lookup.iter().enumerate() {
            binding
                .validate()
                .map_err(|e| format!("gate.credential_lookup[{i}]: {e}"))?;
        }

        Ok(())
    }
}

/// An ordered (action, lookup field) pair.
///
/// Ordering is significant: the first action whose resolution yields a
/// non-empty whitelist set is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBinding {
    /// Registered action name.
    pub action: String,

    /// Store field the resolved value is looked up under.
    pub lookup_field: String,
}

impl ActionBinding {
    /// Validate the binding.
    pub fn validate(&self) -> Result<(), String> {
        if self.action.is_empty() {
            return Err("action cannot be empty".to_string());
        }
        if self.lookup_field.is_empty() {
            return Err("lookup_field cannot be empty".to_string());
        }
        Ok(())
    }
}

/// A (credential keyword, lookup field) pair for backend screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBinding {
    /// Keyword looked for among an authentication attempt's fields.
    pub keyword: String,

    /// Store field the keyword's value is looked up under.
    pub lookup_field: String,
}

impl CredentialBinding {
    /// Validate the binding.
    pub fn validate(&self) -> Result<(), String> {
        if self.keyword.is_empty() {
            return Err("keyword cannot be empty".to_string());
        }
        if self.lookup_field.is_empty() {
            return Err("lookup_field cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Cache layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether resolved whitelist sets are cached.
    #[serde(default)]
    pub enabled: bool,

    /// Snapshot time-to-live in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.ttl_secs == 0 {
            return Err("cache.ttl_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// A whitelist seeded into the in-memory store from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistSeed {
    /// Primary key.
    pub id: u64,

    /// Human-readable name.
    pub name: String,

    /// Unique slug.
    pub slug: String,

    /// Owning principal id.
    #[serde(default)]
    pub owner: Option<u64>,

    /// Ranges in CIDR notation.
    #[serde(default)]
    pub ranges: Vec<String>,
}

impl WhitelistSeed {
    /// Validate the seed, including every CIDR string.
    pub fn validate(&self) -> Result<(), String> {
        if self.slug.is_empty() {
            return Err("slug cannot be empty".to_string());
        }

        for range in &self.ranges {
            matcher::parse_cidr(range).map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert!(config.enabled);
        assert!(config.exempt_superusers);
        assert_eq!(config.request_ip_headers.len(), 2);
        assert!(config.actions.is_empty());
    }

    #[test]
    fn test_enabled_gate_requires_actions() {
        let config = GateConfig::default();
        assert!(config.validate().is_err());

        let config = GateConfig::default().with_action("principal-id", "owner");
        assert!(config.validate().is_ok());

        let disabled = GateConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_binding_validation() {
        let binding = ActionBinding {
            action: String::new(),
            lookup_field: "pk".to_string(),
        };
        assert!(binding.validate().is_err());

        let binding = CredentialBinding {
            keyword: "username".to_string(),
            lookup_field: String::new(),
        };
        assert!(binding.validate().is_err());
    }

    #[test]
    fn test_cache_config_validation() {
        let config = CacheConfig {
            enabled: true,
            ttl_secs: 0,
        };
        assert!(config.validate().is_err());

        let config = CacheConfig {
            enabled: false,
            ttl_secs: 0,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_seed_validates_cidrs() {
        let seed = WhitelistSeed {
            id: 1,
            name: "office".to_string(),
            slug: "office".to_string(),
            owner: None,
            ranges: vec!["10.0.0.0/8".to_string()],
        };
        assert!(seed.validate().is_ok());

        let bad = WhitelistSeed {
            ranges: vec!["10.0.0.0/40".to_string()],
            ..seed
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GateConfig::new()
            .with_action("principal-id", "owner")
            .with_credential("username", "owner");

        let text = toml::to_string(&config).unwrap();
        let parsed: GateConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.actions, config.actions);
        assert_eq!(parsed.credential_lookup, config.credential_lookup);
    }
}
