//! Whitelist store trait and the in-memory reference store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::error::{WhitelistError, WhitelistResult};
use super::model::{IpRange, Whitelist};

/// Lookup field resolving a whitelist by primary key.
pub const FIELD_PK: &str = "pk";

/// Lookup field resolving whitelists by owning principal.
pub const FIELD_OWNER: &str = "owner";

/// Lookup field resolving a whitelist by slug.
pub const FIELD_SLUG: &str = "slug";

/// Persistence boundary for whitelist records.
///
/// `find_by_field` returns every whitelist matching the lookup key, each
/// with its ranges. An empty result means "no governing whitelist for this
/// key" and is not an error; a store outage is.
pub trait WhitelistStore: Send + Sync {
    /// Resolve the whitelists matching a lookup key.
    ///
    /// # Errors
    ///
    /// Returns `WhitelistError::UnknownLookupField` if the store does not
    /// index the requested field, and `WhitelistError::StoreUnavailable`
    /// if the backing store cannot be reached.
    fn find_by_field(&self, field: &str, value: &str) -> WhitelistResult<Vec<Whitelist>>;

    /// Notification that whitelist data reachable from this lookup key
    /// changed. Caching stores drop their entry here; direct stores have
    /// nothing to do.
    fn invalidate(&self, _field: &str, _value: &str) {}
}

impl<S: WhitelistStore + ?Sized> WhitelistStore for Arc<S> {
    fn find_by_field(&self, field: &str, value: &str) -> WhitelistResult<Vec<Whitelist>> {
        (**self).find_by_field(field, value)
    }

    fn invalidate(&self, field: &str, value: &str) {
        (**self).invalidate(field, value);
    }
}

/// In-memory whitelist store.
///
/// The reference implementation used by tests and single-node deployments;
/// production hosts put their own store behind [`WhitelistStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<u64, Whitelist>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a whitelist.
    pub fn insert(&self, whitelist: Whitelist) {
        self.records.write().unwrap().insert(whitelist.id, whitelist);
    }

    /// Append a range to an existing whitelist.
    ///
    /// # Errors
    ///
    /// Returns `WhitelistError::UnknownLookupField` style errors never;
    /// returns `WhitelistError::InvalidConfig` if the whitelist does not
    /// exist.
    pub fn add_range(&self, id: u64, range: IpRange) -> WhitelistResult<()> {
        let mut records = self.records.write().unwrap();
        let whitelist = records
            .get_mut(&id)
            .ok_or_else(|| WhitelistError::InvalidConfig(format!("no whitelist with id {id}")))?;
        whitelist.ranges.push(range);
        Ok(())
    }

    /// Remove a whitelist.
    pub fn remove(&self, id: u64) -> Option<Whitelist> {
        self.records.write().unwrap().remove(&id)
    }

    /// Fetch a single whitelist by primary key.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<Whitelist> {
        self.records.read().unwrap().get(&id).cloned()
    }

    /// Number of whitelists in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Returns `true` if the store holds no whitelists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

impl WhitelistStore for MemoryStore {
    fn find_by_field(&self, field: &str, value: &str) -> WhitelistResult<Vec<Whitelist>> {
        let records = self.records.read().unwrap();

        let mut matches: Vec<Whitelist> = match field {
            FIELD_PK => {
                let Ok(id) = value.parse::<u64>() else {
                    return Ok(Vec::new());
                };
                records.get(&id).cloned().into_iter().collect()
            },
            FIELD_OWNER => {
                let Ok(owner) = value.parse::<u64>() else {
                    return Ok(Vec::new());
                };
                records
                    .values()
                    .filter(|w| w.owner_id == Some(owner))
                    .cloned()
                    .collect()
            },
            FIELD_SLUG => records
                .values()
                .filter(|w| w.slug == value)
                .cloned()
                .collect(),
            other => {
                return Err(WhitelistError::UnknownLookupField {
                    field: other.to_string(),
                })
            },
        };

        // Deterministic ordering for snapshots and tests.
        matches.sort_by_key(|w| w.id);
        Ok(matches)
    }
}
