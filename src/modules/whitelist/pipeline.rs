//! Ordered credential-action pipeline.
//!
//! A deployment configures an ordered list of (action, lookup field)
//! bindings. The pipeline invokes each action in turn; the first action
//! whose resolved value yields a non-empty whitelist set is terminal, and
//! the candidate IP is judged against exactly that set. Actions that skip,
//! resolve nothing, or resolve an empty set simply hand over to the next
//! binding.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::config::ActionBinding;
use super::error::{WhitelistError, WhitelistResult};
use super::model::Whitelist;
use super::store::WhitelistStore;

/// Context handed to each pipeline action.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// The requesting principal, if authenticated.
    pub principal_id: Option<u64>,

    /// Arbitrary request or credential fields.
    pub fields: HashMap<String, String>,
}

impl ActionContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the principal id.
    #[must_use]
    pub fn with_principal_id(mut self, id: u64) -> Self {
        self.principal_id = Some(id);
        self
    }

    /// Add a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Result of invoking a single action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action does not support the requested lookup field, or has no
    /// value to offer for this context. The pipeline moves on.
    Skip,

    /// The action resolved a lookup value.
    Resolved(String),
}

/// A registered pipeline action.
///
/// Receives the evaluation context and the lookup field named by the
/// binding, so an action can decline fields it does not understand.
pub type ActionFn = Arc<dyn Fn(&ActionContext, &str) -> ActionOutcome + Send + Sync>;

/// Registry mapping action names to typed callables.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionFn>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ActionRegistry").field("actions", &names).finish()
    }
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the built-in actions.
    ///
    /// - `principal-id`: resolves the context's principal id
    /// - `request-field`: resolves the context field named by the binding's
    ///   lookup field, skipping when that field is absent
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("principal-id", |ctx: &ActionContext, _field: &str| {
            match ctx.principal_id {
                Some(id) => ActionOutcome::Resolved(id.to_string()),
                None => ActionOutcome::Skip,
            }
        });

        registry.register("request-field", |ctx: &ActionContext, field: &str| {
            match ctx.fields.get(field) {
                Some(value) => ActionOutcome::Resolved(value.clone()),
                None => ActionOutcome::Skip,
            }
        });

        registry
    }

    /// Register an action under a name, replacing any existing action.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        action: impl Fn(&ActionContext, &str) -> ActionOutcome + Send + Sync + 'static,
    ) {
        self.actions.insert(name.into(), Arc::new(action));
    }

    /// Look up an action by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionFn> {
        self.actions.get(name)
    }

    /// Check whether an action is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if no actions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// The terminal evaluation produced by the first non-empty resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the candidate IP was permitted by the governing set.
    pub permitted: bool,

    /// Slugs of the whitelists that governed the decision.
    pub whitelists: Vec<String>,

    /// The lookup field that resolved the set.
    pub lookup_field: String,

    /// The resolved lookup value.
    pub value: String,
}

/// Result of running the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// No action produced a governing whitelist set. Callers treat this as
    /// pass-through, distinct from an explicit denial.
    NotApplicable,

    /// A non-empty whitelist set governed the decision.
    Evaluated(Evaluation),
}

/// Whether an IP is permitted by any range of any whitelist in the set.
///
/// An unresolved IP is never trusted.
#[must_use]
pub fn permits(ip: Option<u32>, whitelists: &[Whitelist]) -> bool {
    match ip {
        Some(ip) => whitelists.iter().any(|w| w.permits(ip)),
        None => false,
    }
}

/// Evaluates ordered action bindings against a whitelist store.
#[derive(Debug, Clone)]
pub struct CredentialPipeline {
    registry: ActionRegistry,
}

impl CredentialPipeline {
    /// Create a pipeline over an action registry.
    #[must_use]
    pub fn new(registry: ActionRegistry) -> Self {
        Self { registry }
    }

    /// The pipeline's action registry.
    #[must_use]
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Verify that every binding references a registered action.
    ///
    /// Run once at startup; a missing action is a configuration error, not
    /// something to discover per request.
    pub fn check_bindings(&self, bindings: &[ActionBinding]) -> WhitelistResult<()> {
        for binding in bindings {
            if !self.registry.contains(&binding.action) {
                return Err(WhitelistError::UnknownAction {
                    action: binding.action.clone(),
                });
            }
        }
        Ok(())
    }

    /// Run the bindings in order and return the first terminal evaluation.
    ///
    /// # Errors
    ///
    /// Returns `WhitelistError::UnknownAction` for a binding missing from
    /// the registry and propagates store outages. An
    /// `UnknownLookupField` from the store only skips that binding.
    pub fn evaluate(
        &self,
        bindings: &[ActionBinding],
        ctx: &ActionContext,
        ip: Option<u32>,
        store: &dyn WhitelistStore,
    ) -> WhitelistResult<PipelineOutcome> {
        for binding in bindings {
            let action = self.registry.get(&binding.action).ok_or_else(|| {
                WhitelistError::UnknownAction {
                    action: binding.action.clone(),
                }
            })?;

            let value = match (action.as_ref())(ctx, &binding.lookup_field) {
                ActionOutcome::Resolved(value) => value,
                ActionOutcome::Skip => {
                    debug!(action = %binding.action, "action skipped");
                    continue;
                },
            };

            let whitelists = match store.find_by_field(&binding.lookup_field, &value) {
                Ok(whitelists) => whitelists,
                Err(WhitelistError::UnknownLookupField { field }) => {
                    debug!(action = %binding.action, field, "lookup field not indexed, skipping");
                    continue;
                },
                Err(e) => return Err(e),
            };

            if whitelists.is_empty() {
                debug!(
                    action = %binding.action,
                    field = %binding.lookup_field,
                    value,
                    "no governing whitelists, trying next action"
                );
                continue;
            }

            // First non-empty resolution is terminal, pass or deny.
            let permitted = permits(ip, &whitelists);
            return Ok(PipelineOutcome::Evaluated(Evaluation {
                permitted,
                whitelists: whitelists.into_iter().map(|w| w.slug).collect(),
                lookup_field: binding.lookup_field.clone(),
                value,
            }));
        }

        Ok(PipelineOutcome::NotApplicable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::whitelist::matcher::parse_ip;
    use crate::modules::whitelist::store::{MemoryStore, FIELD_PK};

    fn binding(action: &str, field: &str) -> ActionBinding {
        ActionBinding {
            action: action.to_string(),
            lookup_field: field.to_string(),
        }
    }

    fn store_with_whitelist() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(
            Whitelist::new(1, "asdf", "asdf")
                .with_cidr("127.0.0.1/32")
                .unwrap(),
        );
        store
    }

    #[test]
    fn test_skipping_action_is_not_fatal() {
        let store = store_with_whitelist();
        let mut registry = ActionRegistry::new();
        registry.register("always-skip", |_: &ActionContext, _: &str| ActionOutcome::Skip);

        let pipeline = CredentialPipeline::new(registry);
        let outcome = pipeline
            .evaluate(
                &[binding("always-skip", FIELD_PK)],
                &ActionContext::new(),
                parse_ip("127.0.0.1").ok(),
                &store,
            )
            .unwrap();

        assert_eq!(outcome, PipelineOutcome::NotApplicable);
    }

    #[test]
    fn test_unindexed_field_skips_to_next_action() {
        let store = store_with_whitelist();
        let mut registry = ActionRegistry::new();
        registry.register("one", |_: &ActionContext, _: &str| {
            ActionOutcome::Resolved("1".to_string())
        });

        let pipeline = CredentialPipeline::new(registry);

        // The store does not index "anything"; the binding is skipped and
        // the pipeline falls through to not-applicable.
        let outcome = pipeline
            .evaluate(
                &[binding("one", "anything")],
                &ActionContext::new(),
                parse_ip("127.0.0.1").ok(),
                &store,
            )
            .unwrap();
        assert_eq!(outcome, PipelineOutcome::NotApplicable);
    }

    #[test]
    fn test_empty_resolution_skips_to_next_action() {
        let store = MemoryStore::new();
        let mut registry = ActionRegistry::new();
        registry.register("one", |_: &ActionContext, _: &str| {
            ActionOutcome::Resolved("1".to_string())
        });

        let pipeline = CredentialPipeline::new(registry);
        let outcome = pipeline
            .evaluate(
                &[binding("one", FIELD_PK)],
                &ActionContext::new(),
                parse_ip("127.0.0.1").ok(),
                &store,
            )
            .unwrap();
        assert_eq!(outcome, PipelineOutcome::NotApplicable);
    }

    #[test]
    fn test_first_resolution_is_terminal_even_on_deny() {
        let store = store_with_whitelist();
        store.insert(
            Whitelist::new(2, "open", "open").with_cidr("0.0.0.0/0").unwrap(),
        );

        let mut registry = ActionRegistry::new();
        registry.register("strict", |_: &ActionContext, _: &str| {
            ActionOutcome::Resolved("1".to_string())
        });
        registry.register("open", |_: &ActionContext, _: &str| {
            ActionOutcome::Resolved("2".to_string())
        });

        let pipeline = CredentialPipeline::new(registry);

        // The first binding resolves whitelist 1 (127.0.0.1/32 only); the
        // denial is final even though the second binding would permit.
        let outcome = pipeline
            .evaluate(
                &[binding("strict", FIELD_PK), binding("open", FIELD_PK)],
                &ActionContext::new(),
                parse_ip("10.112.12.12").ok(),
                &store,
            )
            .unwrap();

        match outcome {
            PipelineOutcome::Evaluated(eval) => {
                assert!(!eval.permitted);
                assert_eq!(eval.whitelists, vec!["asdf".to_string()]);
                assert_eq!(eval.value, "1");
            },
            PipelineOutcome::NotApplicable => panic!("expected a terminal evaluation"),
        }
    }

    #[test]
    fn test_permit_through_default_actions() {
        let store = MemoryStore::new();
        store.insert(
            Whitelist::new(1, "home", "home")
                .with_owner(7)
                .with_cidr("127.0.0.1/32")
                .unwrap(),
        );

        let pipeline = CredentialPipeline::new(ActionRegistry::with_defaults());
        let ctx = ActionContext::new().with_principal_id(7);

        let outcome = pipeline
            .evaluate(
                &[binding("principal-id", "owner")],
                &ctx,
                parse_ip("127.0.0.1").ok(),
                &store,
            )
            .unwrap();

        match outcome {
            PipelineOutcome::Evaluated(eval) => {
                assert!(eval.permitted);
                assert_eq!(eval.lookup_field, "owner");
                assert_eq!(eval.value, "7");
            },
            PipelineOutcome::NotApplicable => panic!("expected a terminal evaluation"),
        }
    }

    #[test]
    fn test_unresolved_ip_is_denied() {
        let store = store_with_whitelist();
        let pipeline = CredentialPipeline::new(ActionRegistry::with_defaults());
        let ctx = ActionContext::new().with_field(FIELD_PK, "1");

        let outcome = pipeline
            .evaluate(&[binding("request-field", FIELD_PK)], &ctx, None, &store)
            .unwrap();

        match outcome {
            PipelineOutcome::Evaluated(eval) => assert!(!eval.permitted),
            PipelineOutcome::NotApplicable => panic!("expected a terminal evaluation"),
        }
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let store = store_with_whitelist();
        let pipeline = CredentialPipeline::new(ActionRegistry::new());

        let err = pipeline
            .evaluate(
                &[binding("missing", FIELD_PK)],
                &ActionContext::new(),
                None,
                &store,
            )
            .unwrap_err();
        assert!(matches!(err, WhitelistError::UnknownAction { .. }));

        assert!(pipeline.check_bindings(&[binding("missing", FIELD_PK)]).is_err());
    }

    #[test]
    fn test_permits_requires_resolved_ip() {
        let whitelist = Whitelist::new(1, "any", "any").with_cidr("0.0.0.0/0").unwrap();
        assert!(!permits(None, &[whitelist.clone()]));
        assert!(permits(parse_ip("8.8.8.8").ok(), &[whitelist]));
        assert!(!permits(parse_ip("8.8.8.8").ok(), &[]));
    }
}
