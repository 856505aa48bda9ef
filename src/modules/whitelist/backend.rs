//! Credential-backend screening.
//!
//! Wraps a host credential backend so that whitelist evaluation gates its
//! `authenticate` call. The wrapper implements the same
//! [`CredentialBackend`] capability as the backend it wraps; hosts that
//! need to know what a backend can do check capability membership through
//! the module manifest, never concrete types.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use super::audit::{AuditSink, LoginRejected, NoopAudit};
use super::config::{ActionBinding, CredentialBinding};
use super::error::WhitelistResult;
use super::matcher;
use super::model::Principal;
use super::pipeline::{ActionContext, ActionOutcome, ActionRegistry, CredentialPipeline, PipelineOutcome};
use super::store::WhitelistStore;

/// An authentication attempt as the host pipeline sees it.
///
/// The request IP travels inside the attempt; backends are never expected
/// to consult ambient state to learn where a login came from.
#[derive(Debug, Clone, Default)]
pub struct AuthAttempt {
    /// Credential keyword/value pairs supplied by the host.
    pub fields: HashMap<String, String>,

    /// The request's origin IP, if the host resolved one.
    pub source_ip: Option<String>,
}

impl AuthAttempt {
    /// Create an empty attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set the origin IP.
    #[must_use]
    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }
}

/// A credential-verification backend.
///
/// Returning `None` means the attempt is rejected; the host tries its next
/// backend or fails the login.
pub trait CredentialBackend: Send + Sync {
    /// Verify an authentication attempt.
    fn authenticate(&self, attempt: &AuthAttempt) -> Option<Principal>;
}

/// Wraps a credential backend with whitelist screening.
///
/// For the first configured (keyword, lookup field) pair whose keyword is
/// present among the attempt's fields and resolves a non-empty whitelist
/// set, the attempt's IP is judged against that set before the wrapped
/// backend ever runs. Attempts without any configured keyword pass through
/// untouched.
pub struct ScreenedBackend<B> {
    inner: B,
    bindings: Vec<CredentialBinding>,
    store: Arc<dyn WhitelistStore>,
    audit: Arc<dyn AuditSink>,
}

impl<B: CredentialBackend> ScreenedBackend<B> {
    /// Wrap a backend.
    #[must_use]
    pub fn new(inner: B, bindings: Vec<CredentialBinding>, store: Arc<dyn WhitelistStore>) -> Self {
        Self {
            inner,
            bindings,
            store,
            audit: Arc::new(NoopAudit),
        }
    }

    /// Set the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// The wrapped backend.
    #[must_use]
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Screen the attempt against one credential binding via a synthetic
    /// single-action pipeline.
    fn screen(
        &self,
        binding: &CredentialBinding,
        attempt: &AuthAttempt,
        ip: Option<u32>,
    ) -> WhitelistResult<PipelineOutcome> {
        let keyword = binding.keyword.clone();
        let mut registry = ActionRegistry::new();
        registry.register("credential", move |ctx: &ActionContext, _field: &str| {
            match ctx.fields.get(&keyword) {
                Some(value) => ActionOutcome::Resolved(value.clone()),
                None => ActionOutcome::Skip,
            }
        });

        let pipeline = CredentialPipeline::new(registry);
        let bindings = [ActionBinding {
            action: "credential".to_string(),
            lookup_field: binding.lookup_field.clone(),
        }];
        let ctx = ActionContext {
            principal_id: None,
            fields: attempt.fields.clone(),
        };

        pipeline.evaluate(&bindings, &ctx, ip, self.store.as_ref())
    }
}

impl<B: CredentialBackend> CredentialBackend for ScreenedBackend<B> {
    fn authenticate(&self, attempt: &AuthAttempt) -> Option<Principal> {
        let ip = attempt
            .source_ip
            .as_deref()
            .and_then(|raw| matcher::parse_ip(raw).ok());

        for binding in &self.bindings {
            if !attempt.fields.contains_key(&binding.keyword) {
                continue;
            }

            match self.screen(binding, attempt, ip) {
                Ok(PipelineOutcome::NotApplicable) => {
                    // This credential produced no governing whitelist; keep
                    // trying subsequent pairs.
                    continue;
                },
                Ok(PipelineOutcome::Evaluated(eval)) if eval.permitted => {
                    debug!(keyword = %binding.keyword, "login screening passed");
                    return self.inner.authenticate(attempt);
                },
                Ok(PipelineOutcome::Evaluated(eval)) => {
                    self.audit.login_rejected(&LoginRejected {
                        keyword: binding.keyword.clone(),
                        lookup_field: binding.lookup_field.clone(),
                        ip: attempt.source_ip.clone(),
                        whitelists: eval.whitelists,
                        at: Utc::now(),
                    });
                    return None;
                },
                Err(e) => {
                    // A store outage must never let a login through
                    // unscreened.
                    error!(error = %e, "whitelist store failed during login screening");
                    return None;
                },
            }
        }

        self.inner.authenticate(attempt)
    }
}
