//! CIDR membership matching.
//!
//! Whitelist ranges are stored as a 32-bit network address plus a prefix
//! length. Matching masks both the candidate and the network by the prefix
//! mask before comparing, so a `/0` range matches every address and a
//! `/32` range matches exactly one.

use super::error::{WhitelistError, WhitelistResult};
use super::model::IpRange;

/// Compute the netmask for a prefix length.
///
/// Prefix lengths are validated at parse/construction time; this assumes
/// `prefix_len <= 32`.
#[must_use]
pub fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        !0u32 << (32 - prefix_len)
    }
}

/// Check whether a candidate IP falls inside a CIDR range.
#[must_use]
pub fn cidr_match(candidate: u32, network: u32, prefix_len: u8) -> bool {
    let mask = prefix_mask(prefix_len);
    (candidate & mask) == (network & mask)
}

/// Parse a dotted-quad IP address string to u32.
pub fn parse_ip(ip: &str) -> WhitelistResult<u32> {
    let parts: Vec<&str> = ip.split('.').collect();

    if parts.len() != 4 {
        return Err(WhitelistError::InvalidIpAddress(format!(
            "expected 4 octets, got {} in '{ip}'",
            parts.len()
        )));
    }

    let mut result = 0u32;
    for (i, part) in parts.iter().enumerate() {
        let octet: u8 = part.parse().map_err(|_| {
            WhitelistError::InvalidIpAddress(format!("invalid octet '{part}' in '{ip}'"))
        })?;
        result |= (octet as u32) << (24 - i * 8);
    }

    Ok(result)
}

/// Parse a CIDR string into an [`IpRange`].
///
/// A bare IP with no `/prefix` is treated as `/32`.
pub fn parse_cidr(addr: &str) -> WhitelistResult<IpRange> {
    let (ip_str, prefix_len) = if let Some((ip, prefix)) = addr.split_once('/') {
        let prefix_len: u8 = prefix.parse().map_err(|_| {
            WhitelistError::InvalidCidr(format!("invalid prefix length in '{addr}'"))
        })?;

        if prefix_len > 32 {
            return Err(WhitelistError::InvalidCidr(format!(
                "prefix length must be 0-32, got {prefix_len}"
            )));
        }

        (ip, prefix_len)
    } else {
        (addr, 32)
    };

    let network = parse_ip(ip_str)?;
    IpRange::new(network, prefix_len)
}

/// Format a u32 address as dotted-quad, for logs and audit events.
#[must_use]
pub fn format_ip(ip: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (ip >> 24) & 0xFF,
        (ip >> 16) & 0xFF,
        (ip >> 8) & 0xFF,
        ip & 0xFF
    )
}
