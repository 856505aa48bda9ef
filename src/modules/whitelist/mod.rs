//! # Whitelist Gating Module
//!
//! Decides whether a request's origin IP is permitted by the whitelists
//! associated with the requesting principal's credentials.
//!
//! ## Features
//!
//! - **CIDR Matching**: whitelist ranges are 32-bit networks with a prefix
//!   length; membership is a masked comparison
//! - **Credential Pipeline**: an ordered list of actions resolves "which
//!   whitelists govern this request"; the first non-empty resolution wins
//! - **Pluggable Store**: persistence sits behind [`WhitelistStore`], with
//!   an optional read-through TTL cache
//! - **Host Integration**: [`WhitelistGate`] guards view dispatch and
//!   [`ScreenedBackend`] guards credential backends
//! - **Audit Events**: rejected logins and views are pushed to an
//!   [`AuditSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use ipwarden::module::{ModuleConfig, ModuleContract};
//! use ipwarden::modules::whitelist::{RequestContext, WhitelistGate};
//!
//! let mut gate = WhitelistGate::new(|| MyForbiddenResponse::new());
//! gate.init(ModuleConfig::from_raw(raw_toml))?;
//! gate.start()?;
//!
//! // In the dispatch pipeline:
//! match gate.check_view(&request, None)? {
//!     None => { /* continue dispatch */ },
//!     Some(response) => { /* short-circuit with the denial response */ },
//! }
//! ```

mod audit;
mod backend;
mod cache;
mod cached;
mod config;
mod error;
pub mod matcher;
mod model;
mod pipeline;
mod remote_ip;
mod store;

mod handler;

pub use audit::{AuditSink, LoginRejected, NoopAudit, ViewRejected};
pub use backend::{AuthAttempt, CredentialBackend, ScreenedBackend};
pub use cache::{CacheBackend, MemoryCache};
pub use cached::{cache_key, CachedStore};
pub use config::{ActionBinding, CacheConfig, CredentialBinding, GateConfig, WhitelistSeed};
pub use error::{WhitelistError, WhitelistResult};
pub use handler::{GateStats, RequestContext, ResetHook, WhitelistGate};
pub use model::{IpRange, Principal, Whitelist};
pub use pipeline::{
    permits, ActionContext, ActionFn, ActionOutcome, ActionRegistry, CredentialPipeline,
    Evaluation, PipelineOutcome,
};
pub use remote_ip::RemoteIpResolver;
pub use store::{MemoryStore, WhitelistStore, FIELD_OWNER, FIELD_PK, FIELD_SLUG};
