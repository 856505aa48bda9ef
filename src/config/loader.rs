//! Configuration file loader.

use super::error::{ConfigError, ConfigResult};
use super::types::WardenConfig;
use std::path::Path;

/// A custom validation pass run after structural validation.
///
/// Deployments register validators for checks the schema cannot express,
/// such as verifying that every configured action name exists in the
/// action registry.
pub trait Validator {
    /// Validate the loaded configuration.
    fn validate(&self, config: &WardenConfig) -> Result<(), String>;
}

/// Configuration loader with validation support.
#[derive(Default)]
pub struct ConfigLoader {
    /// Validators to run on loaded configuration.
    validators: Vec<Box<dyn Validator>>,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator to the loader.
    #[must_use]
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ConfigResult<WardenConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.load_str(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn load_str(&self, content: &str) -> ConfigResult<WardenConfig> {
        let config: WardenConfig = toml::from_str(content)?;
        config.validate()?;

        for validator in &self.validators {
            validator
                .validate(&config)
                .map_err(ConfigError::ValidationError)?;
        }

        Ok(config)
    }

    /// Load configuration or return default if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(&self, path: P) -> ConfigResult<WardenConfig> {
        let path = path.as_ref();
        if path.exists() {
            self.load(path)
        } else {
            Ok(WardenConfig::default())
        }
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save<P: AsRef<Path>>(&self, config: &WardenConfig, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(config)?;
        std::fs::write(path, content).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
        [gate]
        actions = [{ action = "principal-id", lookup_field = "owner" }]
    "#;

    #[test]
    fn test_load_from_string() {
        let loader = ConfigLoader::new();
        let config = loader.load_str(MINIMAL).unwrap();
        assert_eq!(config.gate.actions.len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("warden.toml");
        std::fs::write(&config_path, MINIMAL).unwrap();

        let loader = ConfigLoader::new();
        let config = loader.load(&config_path).unwrap();
        assert_eq!(config.gate.actions[0].lookup_field, "owner");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let loader = ConfigLoader::new();
        let result = loader.load("/nonexistent/path/warden.toml");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default() {
        let loader = ConfigLoader::new();
        let config = loader.load_or_default("/nonexistent/path").unwrap();
        assert!(config.whitelists.is_empty());
    }

    #[test]
    fn test_custom_validator_failure() {
        struct NoOwnerLookups;

        impl Validator for NoOwnerLookups {
            fn validate(&self, config: &WardenConfig) -> Result<(), String> {
                if config.gate.actions.iter().any(|b| b.lookup_field == "owner") {
                    return Err("owner lookups are not allowed here".to_string());
                }
                Ok(())
            }
        }

        let loader = ConfigLoader::new().with_validator(NoOwnerLookups);
        let result = loader.load_str(MINIMAL);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("saved.toml");

        let loader = ConfigLoader::new();
        let config = loader.load_str(MINIMAL).unwrap();
        loader.save(&config, &config_path).unwrap();

        let loaded = loader.load(&config_path).unwrap();
        assert_eq!(loaded.gate.actions.len(), 1);
    }
}
