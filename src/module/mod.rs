//! # Module Contract
//!
//! The host-integration surface of the engine. A host environment manages
//! the gate through the [`ModuleContract`] trait: it discovers what the
//! engine provides via [`ModuleManifest`] and its [`Capability`] set,
//! initializes it with configuration, and drives the
//! init/start/stop lifecycle. Hosts that need to know whether a component
//! can screen credentials or gate request dispatch check capability
//! membership, never concrete types.

mod config;
mod contract;
mod error;
mod manifest;
mod status;

pub use config::ModuleConfig;
pub use contract::{MetricsPayload, ModuleContract};
pub use error::{ModuleError, ModuleResult};
pub use manifest::{Capability, ModuleManifest, ModuleManifestBuilder, SemVer};
pub use status::ModuleStatus;
