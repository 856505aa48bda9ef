//! Whitelist gate implementing ModuleContract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use super::audit::{AuditSink, NoopAudit, ViewRejected};
use super::backend::{CredentialBackend, ScreenedBackend};
use super::cache::MemoryCache;
use super::cached::CachedStore;
use super::error::{WhitelistError, WhitelistResult};
use super::matcher;
use super::model::{Principal, Whitelist};
use super::pipeline::{ActionContext, ActionRegistry, CredentialPipeline, PipelineOutcome};
use super::remote_ip::RemoteIpResolver;
use super::store::{MemoryStore, WhitelistStore};
use crate::config::WardenConfig;
use crate::module::{
    Capability, MetricsPayload, ModuleConfig, ModuleContract, ModuleError, ModuleManifest,
    ModuleResult, ModuleStatus,
};

/// Statistics for the whitelist gate.
#[derive(Debug, Default)]
pub struct GateStats {
    /// Total view checks performed.
    pub checks: AtomicU64,
    /// Checks that passed evaluation.
    pub allowed: AtomicU64,
    /// Checks denied by evaluation.
    pub denied: AtomicU64,
    /// Checks bypassed for superusers.
    pub bypassed: AtomicU64,
    /// Checks where no action produced a governing whitelist.
    pub not_applicable: AtomicU64,
}

impl GateStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// A guarded request as the host dispatch pipeline sees it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// The authenticated principal, if any.
    pub principal: Option<Principal>,

    /// The requested URL, for audit events.
    pub url: String,

    /// Transport metadata the client IP is resolved from.
    pub metadata: HashMap<String, String>,

    /// Extra evaluation fields available to pipeline actions.
    pub fields: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Set the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Add a transport metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add an evaluation field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Denial override exposed by a guarded view.
///
/// When evaluation denies and the view supplies a hook, the gate returns
/// the hook's result verbatim instead of building the configured forbidden
/// response. This lets a view redirect to a remediation flow, or even let
/// the request through.
pub trait ResetHook<R> {
    /// Called on denial with the full request context.
    fn on_denied(&self, request: &RequestContext) -> Option<R>;
}

impl<R, F> ResetHook<R> for F
where
    F: Fn(&RequestContext) -> Option<R>,
{
    fn on_denied(&self, request: &RequestContext) -> Option<R> {
        self(request)
    }
}

/// Wiring built when the gate starts.
struct GateEngine {
    resolver: RemoteIpResolver,
    pipeline: CredentialPipeline,
    store: Arc<dyn WhitelistStore>,
}

/// The whitelist gate module.
///
/// Guards a host's request dispatch: `check_view` returns `None` to let
/// dispatch continue, or the deployment's forbidden response (or a view's
/// reset-hook result) to short-circuit it.
pub struct WhitelistGate<R> {
    /// Deployment configuration.
    config: WardenConfig,

    /// Forbidden-response factory.
    forbidden: Arc<dyn Fn() -> R + Send + Sync>,

    /// Action registry the pipeline draws from.
    registry: ActionRegistry,

    /// Audit sink.
    audit: Arc<dyn AuditSink>,

    /// Store supplied by the host, if any. When absent, an in-memory
    /// store is seeded from configuration.
    external_store: Option<Arc<dyn WhitelistStore>>,

    /// Wiring built at start.
    engine: Option<GateEngine>,

    /// Current status.
    status: ModuleStatus,

    /// Statistics.
    stats: Arc<GateStats>,

    /// Start time for uptime calculation.
    started_at: Option<Instant>,
}

impl<R> std::fmt::Debug for WhitelistGate<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhitelistGate")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("external_store", &self.external_store.is_some())
            .field("running", &self.engine.is_some())
            .field("status", &self.status)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<R> WhitelistGate<R> {
    /// Create a gate with the given forbidden-response factory.
    #[must_use]
    pub fn new(forbidden: impl Fn() -> R + Send + Sync + 'static) -> Self {
        Self {
            config: WardenConfig::default(),
            forbidden: Arc::new(forbidden),
            registry: ActionRegistry::with_defaults(),
            audit: Arc::new(NoopAudit),
            external_store: None,
            engine: None,
            status: ModuleStatus::Stopped,
            stats: Arc::new(GateStats::new()),
            started_at: None,
        }
    }

    /// Set the deployment configuration.
    #[must_use]
    pub fn with_config(mut self, config: WardenConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the action registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Use a host-supplied whitelist store instead of the seeded
    /// in-memory one.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn WhitelistStore>) -> Self {
        self.external_store = Some(store);
        self
    }

    /// Get statistics.
    #[must_use]
    pub fn stats(&self) -> &GateStats {
        &self.stats
    }

    /// The store serving evaluations, once started.
    ///
    /// Hosts route their mutation notifications here so cached snapshots
    /// are invalidated synchronously with the write.
    pub fn store(&self) -> WhitelistResult<Arc<dyn WhitelistStore>> {
        self.engine
            .as_ref()
            .map(|e| Arc::clone(&e.store))
            .ok_or(WhitelistError::NotRunning)
    }

    /// Wrap a credential backend with this gate's screening configuration.
    ///
    /// The wrapper shares the gate's store (and therefore its cache) and
    /// audit sink.
    pub fn wrap_backend<B: CredentialBackend>(
        &self,
        inner: B,
    ) -> WhitelistResult<ScreenedBackend<B>> {
        let store = self.store()?;
        Ok(
            ScreenedBackend::new(inner, self.config.gate.credential_lookup.clone(), store)
                .with_audit(Arc::clone(&self.audit)),
        )
    }

    /// Check a guarded view dispatch.
    ///
    /// Returns `Ok(None)` to continue dispatch, or `Ok(Some(response))`
    /// to short-circuit it with a denial response.
    ///
    /// # Errors
    ///
    /// Returns `WhitelistError::NotRunning` before `start`, and
    /// propagates store outages.
    pub fn check_view(
        &self,
        request: &RequestContext,
        reset: Option<&dyn ResetHook<R>>,
    ) -> WhitelistResult<Option<R>> {
        let engine = self.engine.as_ref().ok_or(WhitelistError::NotRunning)?;

        if !self.config.gate.enabled {
            return Ok(None);
        }

        self.stats.checks.fetch_add(1, Ordering::Relaxed);

        if self.config.gate.exempt_superusers
            && request.principal.as_ref().is_some_and(|p| p.is_superuser)
        {
            self.stats.bypassed.fetch_add(1, Ordering::Relaxed);
            debug!(url = %request.url, "superuser bypass");
            return Ok(None);
        }

        let raw_ip = engine.resolver.resolve(&request.metadata);
        let ip = raw_ip.and_then(|raw| matcher::parse_ip(raw).ok());

        let mut ctx = ActionContext {
            principal_id: request.principal.as_ref().map(|p| p.id),
            fields: request.fields.clone(),
        };
        ctx.fields.extend(
            request
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let outcome =
            engine
                .pipeline
                .evaluate(&self.config.gate.actions, &ctx, ip, engine.store.as_ref())?;

        match outcome {
            PipelineOutcome::NotApplicable => {
                self.stats.not_applicable.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            },
            PipelineOutcome::Evaluated(eval) if eval.permitted => {
                self.stats.allowed.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            },
            PipelineOutcome::Evaluated(eval) => {
                self.stats.denied.fetch_add(1, Ordering::Relaxed);
                self.audit.view_rejected(&ViewRejected {
                    principal_id: request.principal.as_ref().map(|p| p.id),
                    url: request.url.clone(),
                    ip: raw_ip.map(str::to_string),
                    whitelists: eval.whitelists,
                    at: Utc::now(),
                });

                if let Some(hook) = reset {
                    return Ok(hook.on_denied(request));
                }

                Ok(Some((self.forbidden)()))
            },
        }
    }

    /// Build the store serving evaluations, seeding and wrapping as
    /// configured.
    fn build_store(&self) -> ModuleResult<Arc<dyn WhitelistStore>> {
        let base: Arc<dyn WhitelistStore> = match &self.external_store {
            Some(store) => Arc::clone(store),
            None => {
                let store = MemoryStore::new();
                for seed in &self.config.whitelists {
                    let mut whitelist = Whitelist::new(seed.id, &seed.name, &seed.slug);
                    if let Some(owner) = seed.owner {
                        whitelist = whitelist.with_owner(owner);
                    }
                    for range in &seed.ranges {
                        whitelist = whitelist.with_cidr(range).map_err(|e| {
                            ModuleError::StartFailed(format!(
                                "whitelist '{}': {e}",
                                seed.slug
                            ))
                        })?;
                    }
                    store.insert(whitelist);
                }
                Arc::new(store)
            },
        };

        if self.config.cache.enabled {
            let ttl = Duration::from_secs(self.config.cache.ttl_secs);
            Ok(Arc::new(CachedStore::new(base, MemoryCache::new(), ttl)))
        } else {
            Ok(base)
        }
    }
}

impl<R: Send + Sync + 'static> ModuleContract for WhitelistGate<R> {
    fn manifest(&self) -> ModuleManifest {
        let mut builder = ModuleManifest::builder("whitelist")
            .description("IP whitelist gating for authentication and dispatch pipelines")
            .version(1, 0, 0)
            .capability(Capability::IpFiltering)
            .capability(Capability::RequestGating)
            .capability(Capability::CredentialScreening)
            .capability(Capability::AuditEvents)
            .capability(Capability::Metrics);

        if self.config.cache.enabled {
            builder = builder.capability(Capability::WhitelistCache);
        }

        builder.build()
    }

    fn init(&mut self, config: ModuleConfig) -> ModuleResult<()> {
        if self.status != ModuleStatus::Stopped {
            return Err(ModuleError::InvalidState {
                current: self.status.to_string(),
                expected: "Stopped".to_string(),
            });
        }

        info!("Initializing whitelist gate");

        if let Some(raw) = config.raw_config() {
            self.config = toml::from_str(raw)
                .map_err(|e| ModuleError::ConfigError(format!("failed to parse config: {e}")))?;
        }

        self.config
            .validate()
            .map_err(|e| ModuleError::ConfigError(e.to_string()))?;

        // Every configured action must exist before the first request.
        let pipeline = CredentialPipeline::new(self.registry.clone());
        pipeline
            .check_bindings(&self.config.gate.actions)
            .map_err(|e| ModuleError::ConfigError(e.to_string()))?;

        self.status = ModuleStatus::Initializing;
        info!("Whitelist gate initialized");
        Ok(())
    }

    fn start(&mut self) -> ModuleResult<()> {
        if self.status != ModuleStatus::Initializing {
            return Err(ModuleError::InvalidState {
                current: self.status.to_string(),
                expected: "Initializing".to_string(),
            });
        }

        debug!("Starting whitelist gate");

        let store = self.build_store()?;
        self.engine = Some(GateEngine {
            resolver: RemoteIpResolver::new(self.config.gate.request_ip_headers.clone()),
            pipeline: CredentialPipeline::new(self.registry.clone()),
            store,
        });

        self.status = ModuleStatus::Running;
        self.started_at = Some(Instant::now());

        info!(
            actions = self.config.gate.actions.len(),
            cached = self.config.cache.enabled,
            "Whitelist gate started"
        );
        Ok(())
    }

    fn stop(&mut self) -> ModuleResult<()> {
        debug!("Stopping whitelist gate");

        self.engine = None;
        self.status = ModuleStatus::Stopped;
        self.started_at = None;

        info!("Whitelist gate stopped");
        Ok(())
    }

    fn status(&self) -> ModuleStatus {
        self.status.clone()
    }

    fn metrics(&self) -> MetricsPayload {
        let mut metrics = MetricsPayload::new();

        metrics.counter("checks", self.stats.checks.load(Ordering::Relaxed));
        metrics.counter("allowed", self.stats.allowed.load(Ordering::Relaxed));
        metrics.counter("denied", self.stats.denied.load(Ordering::Relaxed));
        metrics.counter("bypassed", self.stats.bypassed.load(Ordering::Relaxed));
        metrics.counter(
            "not_applicable",
            self.stats.not_applicable.load(Ordering::Relaxed),
        );

        if let Some(started) = self.started_at {
            metrics.gauge("uptime_secs", started.elapsed().as_secs_f64());
        }

        metrics
    }
}
