//! # ipwarden
//!
//! An IP whitelist gating engine for authentication and request-dispatch
//! pipelines. Given a request bound to an authenticated principal, ipwarden
//! decides whether the request's origin IP is permitted by the whitelists
//! associated with that principal's credentials.
//!
//! ## Features
//!
//! - CIDR-based whitelist matching on 32-bit addresses
//! - Ordered credential-action pipeline with a typed action registry
//! - Pluggable whitelist store with an optional TTL cache layer
//! - Credential-backend screening and request-gate integration points
//! - Structured audit events for rejected logins and rejected views
//!
//! ## Architecture
//!
//! The engine is exposed to host environments through the
//! [`module::ModuleContract`] trait for uniform lifecycle management. Hosts
//! discover what the engine provides through its manifest and capability
//! set, and install the gate into their authentication and dispatch
//! pipelines explicitly. See the [`module`] documentation for details.
//!
//! ## Modules
//!
//! All gating functionality is provided through the
//! [`modules::whitelist`] module; see its documentation for usage.

pub mod config;
pub mod module;
pub mod modules;
