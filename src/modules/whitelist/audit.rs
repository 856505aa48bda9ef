//! Audit events for rejected logins and rejected views.
//!
//! The engine pushes structured records onto an observer; nothing in the
//! evaluation path depends on whether anything is listening. Sinks must
//! not block: delivery is fire-and-forget from the engine's point of view.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A login attempt rejected by whitelist screening.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRejected {
    /// The credential keyword that triggered screening.
    pub keyword: String,

    /// The lookup field the credential value was resolved under.
    pub lookup_field: String,

    /// The request IP, if one was resolved.
    pub ip: Option<String>,

    /// Slugs of the whitelists that governed the decision.
    pub whitelists: Vec<String>,

    /// When the rejection happened.
    pub at: DateTime<Utc>,
}

/// A guarded view access rejected by whitelist evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ViewRejected {
    /// The requesting principal, if authenticated.
    pub principal_id: Option<u64>,

    /// The requested URL.
    pub url: String,

    /// The request IP, if one was resolved.
    pub ip: Option<String>,

    /// Slugs of the whitelists that governed the decision.
    pub whitelists: Vec<String>,

    /// When the rejection happened.
    pub at: DateTime<Utc>,
}

/// Observer for audit events.
pub trait AuditSink: Send + Sync {
    /// A login attempt was rejected.
    fn login_rejected(&self, event: &LoginRejected);

    /// A guarded view access was rejected.
    fn view_rejected(&self, event: &ViewRejected);
}

/// Sink that discards all events.
#[derive(Debug, Default)]
pub struct NoopAudit;

impl AuditSink for NoopAudit {
    fn login_rejected(&self, _event: &LoginRejected) {}

    fn view_rejected(&self, _event: &ViewRejected) {}
}
