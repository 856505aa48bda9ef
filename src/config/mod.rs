//! # Configuration
//!
//! TOML configuration for the engine. The deployment file is loaded and
//! validated once at startup; configuration problems are fatal there, and
//! never discovered per request.
//!
//! ```toml
//! [gate]
//! request_ip_headers = ["x-forwarded-for", "remote-addr"]
//! actions = [{ action = "principal-id", lookup_field = "owner" }]
//!
//! [cache]
//! enabled = true
//! ttl_secs = 60
//!
//! [[whitelists]]
//! id = 1
//! name = "Office"
//! slug = "office"
//! ranges = ["203.0.113.0/24"]
//! ```

mod error;
mod loader;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Validator};
pub use types::WardenConfig;
