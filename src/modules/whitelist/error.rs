//! Whitelist engine error types.

use thiserror::Error;

/// Result type for whitelist operations.
pub type WhitelistResult<T> = Result<T, WhitelistError>;

/// Errors that can occur during whitelist evaluation.
#[derive(Debug, Error)]
pub enum WhitelistError {
    /// IP address parsing error.
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// CIDR parsing error.
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    /// A lookup referenced a field the store does not index.
    ///
    /// Recovered locally by the pipeline, which skips to the next action.
    #[error("unknown lookup field '{field}'")]
    UnknownLookupField {
        /// The field name that was requested.
        field: String,
    },

    /// An action binding referenced an action missing from the registry.
    #[error("unknown action '{action}' in action list")]
    UnknownAction {
        /// The action name that was requested.
        action: String,
    },

    /// The persistent whitelist store could not be reached.
    ///
    /// Never treated as "no whitelists"; surfaced to the caller.
    #[error("whitelist store unavailable: {0}")]
    StoreUnavailable(String),

    /// Cache backend failure.
    ///
    /// The cached store degrades to direct reads on this error.
    #[error("cache backend error: {0}")]
    CacheError(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The gate was asked to evaluate before being started.
    #[error("module is not running")]
    NotRunning,
}
