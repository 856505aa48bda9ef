//! Module configuration carrier.

/// Opaque configuration handed to a module at `init` time.
///
/// The host does not interpret module configuration; it carries the raw
/// TOML through and lets the module parse its own section.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    /// Raw TOML string (if available).
    raw: Option<String>,
}

impl ModuleConfig {
    /// Creates a new empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `ModuleConfig` from a raw TOML string.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    /// Gets the raw configuration string.
    #[must_use]
    pub fn raw_config(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Returns `true` if no configuration was provided.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }
}
