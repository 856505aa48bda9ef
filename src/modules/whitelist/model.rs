//! Whitelist data model.

use serde::{Deserialize, Serialize};

use super::error::{WhitelistError, WhitelistResult};
use super::matcher;

/// A CIDR range owned by a whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRange {
    /// Network address as u32.
    pub network: u32,

    /// CIDR prefix length (0-32).
    pub prefix_len: u8,
}

impl IpRange {
    /// Create a new range.
    ///
    /// # Errors
    ///
    /// Returns `WhitelistError::InvalidCidr` if the prefix length exceeds 32.
    pub fn new(network: u32, prefix_len: u8) -> WhitelistResult<Self> {
        if prefix_len > 32 {
            return Err(WhitelistError::InvalidCidr(format!(
                "prefix length must be 0-32, got {prefix_len}"
            )));
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Check whether a candidate IP falls inside this range.
    #[must_use]
    pub fn contains(&self, candidate: u32) -> bool {
        matcher::cidr_match(candidate, self.network, self.prefix_len)
    }
}

impl std::fmt::Display for IpRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", matcher::format_ip(self.network), self.prefix_len)
    }
}

/// A named whitelist owning an ordered set of CIDR ranges.
///
/// Read-heavy, write-rare: administrators create and update whitelists,
/// every guarded request reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    /// Primary key.
    pub id: u64,

    /// Human-readable name.
    pub name: String,

    /// Unique slug.
    pub slug: String,

    /// Owning principal, for owner-keyed lookups.
    pub owner_id: Option<u64>,

    /// Ranges belonging to this whitelist.
    pub ranges: Vec<IpRange>,
}

impl Whitelist {
    /// Create a new whitelist with no ranges.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            owner_id: None,
            ranges: Vec::new(),
        }
    }

    /// Set the owning principal.
    #[must_use]
    pub fn with_owner(mut self, owner_id: u64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Add a range.
    #[must_use]
    pub fn with_range(mut self, range: IpRange) -> Self {
        self.ranges.push(range);
        self
    }

    /// Add a range given in CIDR notation.
    ///
    /// # Errors
    ///
    /// Returns an error if the CIDR string is malformed.
    pub fn with_cidr(self, cidr: &str) -> WhitelistResult<Self> {
        let range = matcher::parse_cidr(cidr)?;
        Ok(self.with_range(range))
    }

    /// Check whether any range in this whitelist contains the candidate IP.
    #[must_use]
    pub fn permits(&self, candidate: u32) -> bool {
        self.ranges.iter().any(|range| range.contains(candidate))
    }
}

/// A principal known to the host environment.
///
/// The host passes this through with each guarded request; superusers are
/// exempt from whitelist evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Principal identifier in the host's user store.
    pub id: u64,

    /// Login name, for audit events.
    pub username: String,

    /// Superusers bypass whitelist evaluation entirely.
    pub is_superuser: bool,
}

impl Principal {
    /// Create a new non-superuser principal.
    #[must_use]
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            is_superuser: false,
        }
    }

    /// Mark the principal as a superuser.
    #[must_use]
    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::whitelist::matcher::parse_ip;

    #[test]
    fn test_range_rejects_bad_prefix() {
        assert!(IpRange::new(0, 33).is_err());
        assert!(IpRange::new(0, 32).is_ok());
        assert!(IpRange::new(0, 0).is_ok());
    }

    #[test]
    fn test_range_display() {
        let range = IpRange::new(parse_ip("10.0.0.0").unwrap(), 8).unwrap();
        assert_eq!(range.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_whitelist_permits_any_range() {
        let whitelist = Whitelist::new(1, "internal", "internal")
            .with_cidr("10.0.0.0/8")
            .unwrap()
            .with_cidr("192.168.1.0/24")
            .unwrap();

        assert!(whitelist.permits(parse_ip("10.1.2.3").unwrap()));
        assert!(whitelist.permits(parse_ip("192.168.1.200").unwrap()));
        assert!(!whitelist.permits(parse_ip("8.8.8.8").unwrap()));
    }

    #[test]
    fn test_empty_whitelist_permits_nothing() {
        let whitelist = Whitelist::new(1, "empty", "empty");
        assert!(!whitelist.permits(parse_ip("10.0.0.1").unwrap()));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let whitelist = Whitelist::new(4, "office", "office")
            .with_owner(9)
            .with_cidr("203.0.113.0/24")
            .unwrap();

        let bytes = rmp_serde::to_vec(&whitelist).unwrap();
        let restored: Whitelist = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, whitelist);
    }
}
